//! Extraction of the client data a MaNGOS server needs.
//!
//! The binary is a thin layer over [`commands`]. The pieces shared by several commands live in
//! [`extract`] (writing members to disk) and [`tables`] (the values read from the world tables).

pub mod commands;
pub mod error;
pub mod extract;
pub mod tables;
