//! Zen (Family 17h/19h) SMN definitions

pub mod thm;
