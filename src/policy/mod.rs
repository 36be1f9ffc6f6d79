mod builder;
pub use builder::{AllowRule, AllowRules, AllowRulesBuilder};

use std::fmt;

use tracing::trace;

use crate::subject::{accessor_name, simple_type_name};
use crate::{Error, Result};

/// Authorization rules for one subject type.
///
/// A policy answers for two things:
/// - explicit predicates, written in [`check`](Policy::check);
/// - declarative grants, returned once from [`allow_rules`](Policy::allow_rules).
///
/// An explicit predicate always takes precedence over the allow-table for the
/// same action. Anything neither of them grants is denied.
///
/// ```
/// use may_i::{AllowRules, Policy, Result, Scope};
///
/// struct User { manager: bool }
/// struct Contract { signed: bool }
///
/// struct ContractPolicy;
///
/// impl Policy for ContractPolicy {
///     type Actor = User;
///     type Subject = Contract;
///
///     fn allow_rules() -> Result<AllowRules> {
///         AllowRules::builder().allow_anyone_to(["create"]).build()
///     }
///
///     fn check(&self, action: &str, scope: &Scope<'_, User, Contract>) -> Result<Option<bool>> {
///         Ok(match action {
///             "update" => Some(
///                 scope.user().is_some_and(|user| user.manager) || !scope.subject().signed,
///             ),
///             _ => None,
///         })
///     }
/// }
/// ```
pub trait Policy: Send + Sync + 'static {
    type Actor: 'static;
    type Subject: 'static;

    /// Declarative grants of this policy type.
    ///
    /// Invoked once, when the policy is registered; the table is frozen afterwards.
    fn allow_rules() -> Result<AllowRules>
    where
        Self: Sized,
    {
        Ok(AllowRules::default())
    }

    /// Explicit predicate for `action`.
    ///
    /// Returns `None` when the policy has no predicate for the action, in which
    /// case the allow-table decides. Errors propagate to the caller as is.
    fn check(
        &self,
        _action: &str,
        _scope: &Scope<'_, Self::Actor, Self::Subject>,
    ) -> Result<Option<bool>> {
        Ok(None)
    }
}

/// The actor and subject a predicate is evaluated against.
#[derive(Debug)]
pub struct Scope<'a, A, S> {
    actor: Option<&'a A>,
    subject: &'a S,
    type_name: &'static str,
    accessor: String,
}

impl<'a, A, S: 'static> Scope<'a, A, S> {
    pub fn new(actor: Option<&'a A>, subject: &'a S) -> Self {
        let type_name = simple_type_name::<S>();
        Self {
            actor,
            subject,
            type_name,
            accessor: accessor_name(type_name),
        }
    }

    /// Like [`new`](Self::new), but for a subject that may be absent.
    pub fn try_new(actor: Option<&'a A>, subject: Option<&'a S>) -> Result<Self> {
        subject
            .map(|subject| Self::new(actor, subject))
            .ok_or(Error::InvalidSubject)
    }
}

impl<'a, A, S> Scope<'a, A, S> {
    /// The requesting principal; `None` for guests.
    pub fn actor(&self) -> Option<&'a A> {
        self.actor
    }

    /// Alias of [`actor`](Self::actor).
    pub fn user(&self) -> Option<&'a A> {
        self.actor
    }

    pub fn subject(&self) -> &'a S {
        self.subject
    }

    /// Simple name of the subject type, e.g. `Contract`.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Lower-cased subject type name, e.g. `contract`.
    pub fn accessor_name(&self) -> &str {
        &self.accessor
    }

    pub fn is_authenticated(&self) -> bool {
        self.actor.is_some()
    }
}

/// A policy bound to one actor and subject.
///
/// Created per authorization check and discarded afterwards.
pub struct PolicyCheck<'a, P: Policy> {
    policy: &'a P,
    rules: &'a AllowRules,
    scope: Scope<'a, P::Actor, P::Subject>,
}

impl<P> fmt::Debug for PolicyCheck<'_, P>
where
    P: Policy,
    P::Actor: fmt::Debug,
    P::Subject: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyCheck")
            .field("policy", &simple_type_name::<P>())
            .field("rules", self.rules)
            .field("scope", &self.scope)
            .finish()
    }
}

impl<'a, P: Policy> PolicyCheck<'a, P> {
    /// Binds `policy` and its allow-table to an actor and subject.
    ///
    /// Fails with [`Error::InvalidSubject`] if `subject` is absent.
    pub fn new<S>(
        policy: &'a P,
        rules: &'a AllowRules,
        actor: Option<&'a P::Actor>,
        subject: S,
    ) -> Result<Self>
    where
        S: Into<Option<&'a P::Subject>>,
    {
        let scope = Scope::try_new(actor, subject.into())?;
        Ok(Self {
            policy,
            rules,
            scope,
        })
    }

    pub fn scope(&self) -> &Scope<'a, P::Actor, P::Subject> {
        &self.scope
    }

    /// Decides whether `action` is permitted.
    ///
    /// 1. the policy's predicate for the action, if it has one;
    /// 2. otherwise the allow-table entry for the action;
    /// 3. otherwise denied.
    pub fn is_allowed(&self, action: &str) -> Result<bool> {
        if let Some(allowed) = self.policy.check(action, &self.scope)? {
            trace!(action, allowed, "decided by predicate");
            return Ok(allowed);
        }

        match self.rules.get(action) {
            Some(rule) => {
                let allowed = rule.permits(self.scope.is_authenticated());
                trace!(action, ?rule, allowed, "decided by allow rule");
                Ok(allowed)
            }
            None => {
                trace!(action, "no predicate or allow rule, denying");
                Ok(false)
            }
        }
    }

    /// Like [`is_allowed`](Self::is_allowed), but a denial is an [`Error::Unauthorized`].
    pub fn authorize(&self, action: &str) -> Result<()> {
        if self.is_allowed(action)? {
            Ok(())
        } else {
            Err(Error::Unauthorized {
                action: action.into(),
                subject_type: self.scope.type_name(),
            })
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[derive(Debug)]
    pub(crate) struct User {
        pub(crate) manager: bool,
    }

    #[derive(Debug)]
    pub(crate) struct Contract {
        pub(crate) signed: bool,
    }

    crate::impl_subject!(Contract);

    pub(crate) struct ContractPolicy;

    impl Policy for ContractPolicy {
        type Actor = User;
        type Subject = Contract;

        fn allow_rules() -> Result<AllowRules> {
            AllowRules::builder()
                .allow_anyone_to(["create", "index"])
                .allow(["show", "archive"])
                // shadowed by the predicate below.
                .allow_anyone_to(["destroy"])
                .build()
        }

        fn check(&self, action: &str, scope: &Scope<'_, User, Contract>) -> Result<Option<bool>> {
            Ok(match action {
                "update" => Some(
                    scope.user().is_some_and(|user| user.manager) || !scope.subject().signed,
                ),
                "destroy" => Some(false),
                "archive" => Some(true),
                "audit" => return Err(Error::predicate("audit log unavailable")),
                _ => None,
            })
        }
    }

    fn check<'a>(
        rules: &'a AllowRules,
        actor: Option<&'a User>,
        contract: &'a Contract,
    ) -> PolicyCheck<'a, ContractPolicy> {
        PolicyCheck::new(&ContractPolicy, rules, actor, contract).expect("subject present")
    }

    #[test]
    fn scope_exposes_actor_and_subject_names() {
        let user = User { manager: true };
        let contract = Contract { signed: true };
        let scope = Scope::new(Some(&user), &contract);

        assert!(scope.is_authenticated());
        assert!(scope.user().unwrap().manager);
        assert!(scope.actor().unwrap().manager);
        assert!(scope.subject().signed);
        assert_eq!("Contract", scope.type_name());
        assert_eq!("contract", scope.accessor_name());
    }

    #[test]
    fn missing_subject_fails_fast() {
        let rules = ContractPolicy::allow_rules().unwrap();
        let user = User { manager: true };

        assert_matches!(
            PolicyCheck::new(&ContractPolicy, &rules, Some(&user), None::<&Contract>),
            Err(Error::InvalidSubject)
        );
        assert_matches!(
            Scope::<'_, User, Contract>::try_new(None, None),
            Err(Error::InvalidSubject)
        );
    }

    #[test]
    fn predicate_decides_update() {
        let rules = ContractPolicy::allow_rules().unwrap();
        let manager = User { manager: true };
        let regular = User { manager: false };
        let signed = Contract { signed: true };
        let unsigned = Contract { signed: false };

        assert!(check(&rules, Some(&manager), &signed).is_allowed("update").unwrap());
        assert!(!check(&rules, Some(&regular), &signed).is_allowed("update").unwrap());
        assert!(check(&rules, Some(&regular), &unsigned).is_allowed("update").unwrap());
        assert!(check(&rules, None, &unsigned).is_allowed("update").unwrap());
        assert!(!check(&rules, None, &signed).is_allowed("update").unwrap());
    }

    #[test]
    fn predicate_overrides_allow_rule() {
        let rules = ContractPolicy::allow_rules().unwrap();
        let contract = Contract { signed: false };
        let manager = User { manager: true };

        // anyone rule, predicate denies.
        assert!(!check(&rules, Some(&manager), &contract).is_allowed("destroy").unwrap());
        // authenticated rule, predicate grants guests.
        assert!(check(&rules, None, &contract).is_allowed("archive").unwrap());
    }

    #[test]
    fn allow_rules_apply_without_predicate() {
        let rules = ContractPolicy::allow_rules().unwrap();
        let contract = Contract { signed: true };
        let user = User { manager: false };

        assert!(check(&rules, None, &contract).is_allowed("create").unwrap());
        assert!(check(&rules, Some(&user), &contract).is_allowed("create").unwrap());
        assert!(!check(&rules, None, &contract).is_allowed("show").unwrap());
        assert!(check(&rules, Some(&user), &contract).is_allowed("show").unwrap());
    }

    #[test]
    fn unknown_action_is_denied() {
        let rules = ContractPolicy::allow_rules().unwrap();
        let contract = Contract { signed: false };
        let manager = User { manager: true };

        assert!(!check(&rules, Some(&manager), &contract).is_allowed("updte").unwrap());
        assert!(!check(&rules, None, &contract).is_allowed("delete").unwrap());
    }

    #[test]
    fn empty_action_follows_the_same_rules() {
        struct AcceptAll;

        impl crate::RuleValidator for AcceptAll {
            fn validate(&self, _field: crate::Field, _value: &str) -> Result<()> {
                Ok(())
            }
        }

        let contract = Contract { signed: false };

        let rules = ContractPolicy::allow_rules().unwrap();
        assert!(!check(&rules, None, &contract).is_allowed("").unwrap());

        let rules = AllowRules::builder()
            .with_validator(AcceptAll)
            .allow_anyone_to([""])
            .build()
            .unwrap();
        assert_eq!(Some(AllowRule::Anyone), rules.get(""));
        assert!(check(&rules, None, &contract).is_allowed("").unwrap());
    }

    #[test]
    fn predicate_error_propagates() {
        let rules = ContractPolicy::allow_rules().unwrap();
        let contract = Contract { signed: false };

        let error = check(&rules, None, &contract).is_allowed("audit").unwrap_err();
        assert_matches!(error, Error::Predicate(_));
        assert_eq!("audit log unavailable", error.to_string());
    }

    #[test]
    fn authorize_matches_is_allowed() {
        let rules = ContractPolicy::allow_rules().unwrap();
        let contract = Contract { signed: true };
        let check = check(&rules, None, &contract);

        assert_matches!(check.authorize("create"), Ok(()));
        assert_matches!(
            check.authorize("update"),
            Err(Error::Unauthorized { action, subject_type: "Contract" }) if action == "update"
        );
    }

    #[test]
    fn policy_without_rules_or_predicates_denies_everything() {
        struct Locked;

        impl Policy for Locked {
            type Actor = User;
            type Subject = Contract;
        }

        let rules = Locked::allow_rules().unwrap();
        let manager = User { manager: true };
        let contract = Contract { signed: false };
        let check = PolicyCheck::new(&Locked, &rules, Some(&manager), &contract).unwrap();

        for action in &["show", "create", "update", "destroy"] {
            assert!(!check.is_allowed(action).unwrap());
        }
    }
}
