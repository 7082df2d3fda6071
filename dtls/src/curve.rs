pub mod named_curve;
