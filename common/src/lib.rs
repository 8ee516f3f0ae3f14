// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Common Modul for the locator
//!
//! Provides the data types and pure transformations that are shared by every modul:
//! the position record, the tracker payload parser and the track export.

pub mod ingest;
pub mod payload;
pub mod position;
pub mod track;
