// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Core data model: the label document, time keys, interpolation, the
//! box-editing state machine, and session state.

pub mod document;
pub mod editor;
pub mod interp;
pub mod session;
pub mod timekey;
