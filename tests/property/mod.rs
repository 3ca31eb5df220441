// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module
//!
//! Generated stack graphs checked against the resolver's ordering
//! guarantees.

mod resolver;
