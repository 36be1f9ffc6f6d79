#![deny(rust_2018_idioms, warnings)]
#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::new_without_default,
    clippy::wrong_self_convention
)]
//! Authorization by per-subject-type policies.
//!
//! Each subject type gets a [`Policy`]: explicit predicates for the actions it
//! cares about, plus a declarative allow-table ([`AllowRules`]) for actions that
//! need no code. Anything not granted by either is denied.
//!
//! An [`Authorizer`] maps subject types to their policies and answers
//! "may this actor do this to that?" with [`Authorizer::decide`], or enforces
//! it with [`Authorizer::authorize`]. Subject types opt in to lookup with
//! [`impl_subject!`].
mod dispatcher;
mod errors;
mod policy;
mod subject;
mod validator;

pub use dispatcher::{Authorizer, AuthorizerBuilder, BoundPolicy};
pub use errors::{Error, Result};
pub use policy::{AllowRule, AllowRules, AllowRulesBuilder, Policy, PolicyCheck, Scope};
pub use subject::{accessor_name, policy_name, simple_type_name, Subject, POLICY_SUFFIX};
pub use validator::{DefaultValidator, Field, RuleValidator};
