mod signal_sink;

pub use signal_sink::*;
