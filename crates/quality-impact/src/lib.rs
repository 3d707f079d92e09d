//! Quality-impact evaluation over architectural models.
//!
//! A [`quality::QualityModel`] catalog links product factors to the quality aspects they impact.
//! [`evaluation::EvaluationModel`] runs the active part of that catalog against one scope of a
//! [`model::System`], calculating measures once per run and deriving a weight for every impact.

pub mod config;
pub mod error;
pub mod evaluation;
pub mod measures;
pub mod model;
pub mod quality;
pub mod telemetry;
