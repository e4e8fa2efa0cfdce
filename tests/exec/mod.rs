extern crate gyre;

mod io;
mod loading;
mod trim;
