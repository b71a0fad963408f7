//! Parsers for the text reports of the external tools.
//!
//! Each tool gets exactly one adapter, and each adapter is tested against
//! captured sample output. The runner forces `LC_ALL=C` on queries so the
//! reports keep the layout these parsers expect.

pub mod df;
pub mod du;
pub mod mount;
