extern crate gyre;

mod ground;
mod location;
