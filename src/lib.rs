//! SkillHub - A role-based learning management site
//!
//! This library provides the core functionality for SkillHub: catalog
//! management for faculty, enrollment and attendance for students, and an
//! administrative console for site branding.

pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod views;
pub mod web;
