mod display;
mod engine_impl;

pub use engine_impl::Engine;
