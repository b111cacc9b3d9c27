// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::Rc;

type Str = Rc<str>;

/// Error type for domain registration, generation and membership checks.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DomainError {
    /// Referenced domain id has no registration
    #[error("domain `{0}` is not registered")]
    Unknown(Str),
    /// Only derived domains can be enumerated
    #[error("domain `{0}` cannot be enumerated")]
    NotGenerable(Str),
    /// Definition references itself, directly or through another domain
    #[error("domain `{0}` is part of a reference cycle")]
    Cycle(Str),
    /// Malformed definition document
    #[error("domain `{domain}`: invalid definition: {reason}")]
    BadDefinition { domain: Str, reason: Str },
    /// A pipeline expression failed to evaluate
    #[error("domain `{domain}`: expression failed: {reason}")]
    Expr { domain: Str, reason: Str },
    /// A transform expression outside the invertible subset was used in a
    /// membership check
    #[error("domain `{domain}`: expression `{expr}` has no inverse")]
    Uninvertible { domain: Str, expr: Str },
    /// The value is well-formed but not a member of the domain
    #[error("value `{value}` is not a member of domain `{domain}`: {reason}")]
    NotMember {
        domain: Str,
        value: Str,
        reason: Str,
    },
}
