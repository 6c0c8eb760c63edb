// Copyright (c) Questboard, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Typed filter criteria and the pure log evaluator.
//!
//! A [`Criteria`] is read from chain in its raw encoding (u8 operator and
//! field-type tags plus opaque comparison bytes). Evaluation first narrows it
//! into a [`CriteriaFilter`], a closed variant per operator carrying only the
//! data that operator can legally act on, so that all operator/field-type
//! compatibility checking happens in one place and the match itself is
//! infallible.

use ethers::types::{Bytes, H256, U256};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::error::{ValidationError, ValidationResult};
use crate::types::EthLog;

/// Comparison operator of a criterion, as encoded on chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum FilterType {
    Equal = 0,
    NotEqual = 1,
    GreaterThan = 2,
    LessThan = 3,
    Contains = 4,
}

/// Declared type of the log field a criterion applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum PrimitiveType {
    Uint = 0,
    Address = 1,
    Bytes = 2,
    String = 3,
}

/// One validation rule over one indexed log field, in its raw chain encoding.
///
/// The operator and field-type tags are kept as the u8 values read from chain
/// so that unrecognized values surface as [`ValidationError::InvalidFilter`] /
/// [`ValidationError::TypeMismatch`] at evaluation time instead of failing the
/// chain read itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criteria {
    pub filter_type: u8,
    pub field_type: u8,
    // Position within the log's topic list (0 is the signature itself)
    pub field_index: u8,
    // Opaque comparison value, encoded per `field_type`
    pub filter_data: Bytes,
}

impl Criteria {
    pub fn new(
        filter_type: FilterType,
        field_type: PrimitiveType,
        field_index: u8,
        filter_data: Bytes,
    ) -> Self {
        Self {
            filter_type: filter_type.into(),
            field_type: field_type.into(),
            field_index,
            filter_data,
        }
    }

    pub fn equal(field_type: PrimitiveType, field_index: u8, data: impl Into<Bytes>) -> Self {
        Self::new(FilterType::Equal, field_type, field_index, data.into())
    }

    pub fn not_equal(field_type: PrimitiveType, field_index: u8, data: impl Into<Bytes>) -> Self {
        Self::new(FilterType::NotEqual, field_type, field_index, data.into())
    }

    pub fn greater_than(field_index: u8, value: U256) -> Self {
        Self::new(
            FilterType::GreaterThan,
            PrimitiveType::Uint,
            field_index,
            encode_uint(value),
        )
    }

    pub fn less_than(field_index: u8, value: U256) -> Self {
        Self::new(
            FilterType::LessThan,
            PrimitiveType::Uint,
            field_index,
            encode_uint(value),
        )
    }

    pub fn contains(field_type: PrimitiveType, field_index: u8, data: impl Into<Bytes>) -> Self {
        Self::new(FilterType::Contains, field_type, field_index, data.into())
    }

    /// Narrow into the validated per-operator form.
    pub fn filter(&self) -> ValidationResult<CriteriaFilter> {
        CriteriaFilter::try_from(self)
    }
}

/// Encode a uint comparison value the way indexed uint topics are encoded.
pub fn encode_uint(value: U256) -> Bytes {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    Bytes::from(word.to_vec())
}

/// A criterion narrowed to its operator, with the comparison value already
/// decoded. Constructing one performs all operator/field-type validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CriteriaFilter {
    Equal(Bytes),
    NotEqual(Bytes),
    GreaterThan(U256),
    LessThan(U256),
    Contains(Bytes),
}

impl TryFrom<&Criteria> for CriteriaFilter {
    type Error = ValidationError;

    fn try_from(criteria: &Criteria) -> ValidationResult<Self> {
        let filter_type = FilterType::try_from(criteria.filter_type)
            .map_err(|_| ValidationError::InvalidFilter(criteria.filter_type))?;
        match filter_type {
            // Raw byte equality never interprets the value, so any field
            // type (including unrecognized ones) is acceptable
            FilterType::Equal => Ok(Self::Equal(criteria.filter_data.clone())),
            FilterType::NotEqual => Ok(Self::NotEqual(criteria.filter_data.clone())),
            FilterType::GreaterThan | FilterType::LessThan => {
                require_field_type(filter_type, criteria.field_type, &[PrimitiveType::Uint])?;
                let value = decode_uint(&criteria.filter_data).ok_or(
                    ValidationError::TypeMismatch {
                        filter: filter_type,
                        field_type: criteria.field_type,
                    },
                )?;
                Ok(if filter_type == FilterType::GreaterThan {
                    Self::GreaterThan(value)
                } else {
                    Self::LessThan(value)
                })
            }
            FilterType::Contains => {
                require_field_type(
                    filter_type,
                    criteria.field_type,
                    &[PrimitiveType::Bytes, PrimitiveType::String],
                )?;
                Ok(Self::Contains(criteria.filter_data.clone()))
            }
        }
    }
}

impl CriteriaFilter {
    /// Apply the filter to one 32-byte topic value. Infallible by
    /// construction; all error cases were rejected in `try_from`.
    pub fn matches(&self, topic: &H256) -> bool {
        match self {
            CriteriaFilter::Equal(data) => topic.as_bytes() == &data[..],
            CriteriaFilter::NotEqual(data) => topic.as_bytes() != &data[..],
            CriteriaFilter::GreaterThan(value) => U256::from_big_endian(topic.as_bytes()) > *value,
            CriteriaFilter::LessThan(value) => U256::from_big_endian(topic.as_bytes()) < *value,
            CriteriaFilter::Contains(needle) => contains_subsequence(topic.as_bytes(), needle),
        }
    }
}

fn require_field_type(
    filter: FilterType,
    raw_field_type: u8,
    allowed: &[PrimitiveType],
) -> ValidationResult<()> {
    match PrimitiveType::try_from(raw_field_type) {
        Ok(field_type) if allowed.contains(&field_type) => Ok(()),
        _ => Err(ValidationError::TypeMismatch {
            filter,
            field_type: raw_field_type,
        }),
    }
}

// A value wider than one EVM word cannot be a uint comparison operand
fn decode_uint(data: &[u8]) -> Option<U256> {
    if data.len() > 32 {
        return None;
    }
    Some(U256::from_big_endian(data))
}

fn contains_subsequence(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return true;
    }
    if needle.len() > haystack.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|window| window == needle)
}

/// Evaluate one criterion against one fetched log.
///
/// `Ok(false)` means the log was determined not to satisfy the criterion;
/// every `Err` means the determination could not be made (missing field,
/// bad operator/type combination). The two are never conflated.
pub fn evaluate_criteria(criteria: &Criteria, log: &EthLog) -> ValidationResult<bool> {
    let topic = log.log.topics.get(criteria.field_index as usize).ok_or(
        ValidationError::FieldMissing {
            field_index: criteria.field_index,
            topic_count: log.log.topics.len(),
        },
    )?;
    let filter = CriteriaFilter::try_from(criteria)?;
    Ok(filter.matches(topic))
}
