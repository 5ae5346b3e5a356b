// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Rustux IPC - Kernel Module
//!
//! - [`config`] - Limits and handle table configuration
//! - [`debug`] - Logging macros
//! - [`object`] - Handle table, messages, channels
//! - [`sync`] - Observer and waiter seams
//! - [`syscalls`] - Handle-based entry layer

pub mod config;
pub mod debug;
pub mod object;
pub mod sync;
pub mod syscalls;
