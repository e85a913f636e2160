//! Sensors module - read-only hardware readings

pub mod ambient_light;
