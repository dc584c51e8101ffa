//! `roottools` is a library for building a minimal, byte-level ROOT (CERN) `TFile` writer and
//! for planning how to tile a set of such files into fixed-size partitions.
//!
//! # Features
//! - [X] writing a ROOT archive record-by-record ([`writer`])
//! - [X] relocating the streamer table and key list as they outgrow their preallocated headroom
//! - [X] planning basket-aligned partitions across many files ([`planner`])
//! - [X] serializing a computed partition plan to JSON for reuse
//!
//! # Quick start
//! To write a new archive, use [`writer::Writer::create`]. To plan partitions across a tree's
//! branches, build a [`planner::PartitionSet`] with [`planner::fill`].

pub mod errors;
pub mod io;
pub mod planner;
pub mod writer;
