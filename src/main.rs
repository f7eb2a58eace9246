//! # Voxel World Entry Point
//!
//! Runs the headless demo from the library's `run()` function.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release
//! ```

fn main() {
    voxel_world::run();
}
