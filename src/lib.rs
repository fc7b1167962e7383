//! LAN Tetris (workspace facade crate).
//!
//! Re-exports the workspace crates under one roof so the binary, integration
//! tests and benches can use `lan_tetris::{core, net, types}`.

pub use lan_tetris_core as core;
pub use lan_tetris_net as net;
pub use lan_tetris_types as types;

pub mod autoplay;
