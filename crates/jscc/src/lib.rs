//! End-to-end image communication over a simulated wireless channel.
//!
//! Provides a trainable encoder/decoder pair joined by a differentiable
//! channel model (Rayleigh fading or AWGN at a fixed SNR), plus the training
//! loop that optimizes reconstruction error end-to-end and keeps the best
//! checkpoint by test loss.

pub mod model;
pub mod training;
