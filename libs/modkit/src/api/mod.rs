//! Types shared by REST handlers at the API boundary.

pub mod problem;
