//! File format handlers
//!
//! Only ritobin text is supported; binary `.bin` files are converted to text
//! by external tools first.

pub mod vfx;
