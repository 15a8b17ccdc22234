// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! I/O: durable label storage, configuration, and media loading.

pub mod config;
pub mod gateway;
pub mod media;
