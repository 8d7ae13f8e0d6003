//! Routeglue keeps a proxy router's route table in line with running
//! containers and a static routing file.
//!
//! Every cycle rebuilds the desired name -> backend table from Docker
//! labels and manual entries, reads the router's table, and pushes the
//! difference.  See [`reconcile`] for the cycle and [`desired`] for how
//! names are derived.

pub mod config;
pub mod desired;
pub mod reconcile;
pub mod router;
pub mod runtime;
pub mod scheduler;
pub mod types;
