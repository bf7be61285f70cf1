//! Operator implementations, grouped by function.

mod color;
mod graphics_state;
mod path;
mod text;
mod xobject;
