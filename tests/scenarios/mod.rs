extern crate gyre;

mod ballistic;
mod captive_carry;
