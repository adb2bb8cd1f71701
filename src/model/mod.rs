/*
 * Copyright 2024 ArpNetworking
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! Core data model
//!
//! Defines the wire-level shapes exchanged with clients: incoming
//! transactions and the computed window statistics.

use serde::{Deserialize, Serialize};

/// A single monetary event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction amount, folded as-is (zero and negative included)
    pub amount: f64,

    /// Event time in milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl Transaction {
    /// Create a new transaction
    pub fn new(amount: f64, timestamp: i64) -> Self {
        Self { amount, timestamp }
    }
}

/// Aggregate statistics over the trailing window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    /// Sum of all amounts
    pub sum: f64,

    /// Mean amount
    pub avg: f64,

    /// Largest amount
    pub max: f64,

    /// Smallest amount
    pub min: f64,

    /// Number of transactions
    pub count: u64,
}
