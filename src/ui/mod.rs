// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! UI panels: drawing canvas, object list, and playback timeline.

pub mod canvas;
pub mod objects;
pub mod timeline;
