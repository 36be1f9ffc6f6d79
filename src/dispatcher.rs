use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::subject::{policy_name, simple_type_name, Subject};
use crate::{AllowRules, Error, Policy, PolicyCheck, Result};

/// A registered policy with the subject type erased.
trait ErasedPolicy<A>: Send + Sync {
    fn policy_name(&self) -> &'static str;

    fn is_allowed(&self, actor: Option<&A>, action: &str, subject: &dyn Subject) -> Result<bool>;
}

struct Registration<P> {
    policy: P,
    rules: AllowRules,
}

impl<P: Policy> Registration<P> {
    fn check<'a>(
        &'a self,
        actor: Option<&'a P::Actor>,
        subject: &'a P::Subject,
    ) -> Result<PolicyCheck<'a, P>> {
        PolicyCheck::new(&self.policy, &self.rules, actor, subject)
    }
}

impl<P: Policy> ErasedPolicy<P::Actor> for Registration<P> {
    fn policy_name(&self) -> &'static str {
        simple_type_name::<P>()
    }

    fn is_allowed(
        &self,
        actor: Option<&P::Actor>,
        action: &str,
        subject: &dyn Subject,
    ) -> Result<bool> {
        let typed = subject
            .as_any()
            .downcast_ref::<P::Subject>()
            .ok_or_else(|| Error::SubjectMismatch {
                policy: simple_type_name::<P>(),
                expected: simple_type_name::<P::Subject>(),
                actual: subject.type_name(),
            })?;
        self.check(actor, typed)?.is_allowed(action)
    }
}

/// Resolves the policy of a subject by its runtime type and asks it for a decision.
///
/// Built once at startup through [`AuthorizerBuilder`] and immutable afterwards;
/// an `Authorizer` can be shared between threads and used concurrently.
///
/// Lookup is exact: a subject type without its own registered policy has none,
/// and deciding on it fails with [`Error::PolicyNotFound`] instead of denying.
pub struct Authorizer<A> {
    by_subject: HashMap<TypeId, Arc<dyn ErasedPolicy<A>>>,
    by_policy: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl<A: 'static> Authorizer<A> {
    pub fn builder() -> AuthorizerBuilder<A> {
        AuthorizerBuilder::new()
    }

    /// Binds the policy registered for `subject`'s runtime type to `actor` and `subject`.
    pub fn policy_for<'a>(
        &'a self,
        actor: Option<&'a A>,
        subject: &'a dyn Subject,
    ) -> Result<BoundPolicy<'a, A>> {
        let subject_type = Any::type_id(subject.as_any());
        match self.by_subject.get(&subject_type) {
            Some(policy) => Ok(BoundPolicy {
                policy: &**policy,
                actor,
                subject,
            }),
            None => {
                let type_name = subject.type_name();
                warn!(subject_type = type_name, "no policy registered");
                Err(Error::PolicyNotFound {
                    subject_type: type_name,
                    policy: policy_name(type_name),
                })
            }
        }
    }

    /// Decides whether `actor` may perform `action` on `subject`.
    #[instrument(
        level = "debug",
        skip(self, actor, subject),
        fields(subject_type = subject.type_name(), authenticated = actor.is_some())
    )]
    pub fn decide(&self, actor: Option<&A>, action: &str, subject: &dyn Subject) -> Result<bool> {
        let allowed = self.policy_for(actor, subject)?.is_allowed(action)?;
        debug!(allowed, "authorization decided");
        Ok(allowed)
    }

    /// Like [`decide`](Self::decide), but a denial is an [`Error::Unauthorized`].
    pub fn authorize(&self, actor: Option<&A>, action: &str, subject: &dyn Subject) -> Result<()> {
        if self.decide(actor, action, subject)? {
            Ok(())
        } else {
            Err(unauthorized(action, subject.type_name()))
        }
    }

    /// Decides with the explicitly named policy `P`, bypassing lookup by subject type.
    ///
    /// `P` must have been registered, either as the primary policy of its subject
    /// type or as an alternate.
    #[instrument(
        level = "debug",
        skip(self, actor, subject),
        fields(policy = simple_type_name::<P>(), authenticated = actor.is_some())
    )]
    pub fn decide_as<P>(
        &self,
        actor: Option<&A>,
        action: &str,
        subject: &P::Subject,
    ) -> Result<bool>
    where
        P: Policy<Actor = A>,
    {
        let registration = self
            .by_policy
            .get(&TypeId::of::<P>())
            .and_then(|registration| registration.downcast_ref::<Registration<P>>())
            .ok_or_else(|| {
                warn!(policy = simple_type_name::<P>(), "policy not registered");
                Error::PolicyNotFound {
                    subject_type: simple_type_name::<P::Subject>(),
                    policy: simple_type_name::<P>().into(),
                }
            })?;

        let allowed = registration.check(actor, subject)?.is_allowed(action)?;
        debug!(allowed, "authorization decided");
        Ok(allowed)
    }

    /// Like [`decide_as`](Self::decide_as), but a denial is an [`Error::Unauthorized`].
    pub fn authorize_as<P>(&self, actor: Option<&A>, action: &str, subject: &P::Subject) -> Result<()>
    where
        P: Policy<Actor = A>,
    {
        if self.decide_as::<P>(actor, action, subject)? {
            Ok(())
        } else {
            Err(unauthorized(action, simple_type_name::<P::Subject>()))
        }
    }

    /// `true` if a primary policy is registered for subject type `S`.
    pub fn has_policy_for<S: 'static>(&self) -> bool {
        self.by_subject.contains_key(&TypeId::of::<S>())
    }

    /// Number of registered policies, alternates included.
    pub fn len(&self) -> usize {
        self.by_policy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_policy.is_empty()
    }
}

impl<A> fmt::Debug for Authorizer<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authorizer")
            .field("policies", &policy_names(&self.by_subject))
            .field("registered", &self.by_policy.len())
            .finish()
    }
}

fn policy_names<A>(by_subject: &HashMap<TypeId, Arc<dyn ErasedPolicy<A>>>) -> Vec<&'static str> {
    let mut names: Vec<_> = by_subject.values().map(|policy| policy.policy_name()).collect();
    names.sort_unstable();
    names
}

fn unauthorized(action: &str, subject_type: &'static str) -> Error {
    debug!(action, subject_type, "unauthorized");
    Error::Unauthorized {
        action: action.into(),
        subject_type,
    }
}

/// The policy of one subject bound to an actor, see [`Authorizer::policy_for`].
pub struct BoundPolicy<'a, A> {
    policy: &'a dyn ErasedPolicy<A>,
    actor: Option<&'a A>,
    subject: &'a dyn Subject,
}

impl<'a, A> BoundPolicy<'a, A> {
    pub fn policy_name(&self) -> &'static str {
        self.policy.policy_name()
    }

    pub fn is_allowed(&self, action: &str) -> Result<bool> {
        self.policy.is_allowed(self.actor, action, self.subject)
    }

    pub fn authorize(&self, action: &str) -> Result<()> {
        if self.is_allowed(action)? {
            Ok(())
        } else {
            Err(unauthorized(action, self.subject.type_name()))
        }
    }
}

/// Registers policies and freezes them into an [`Authorizer`].
pub struct AuthorizerBuilder<A> {
    by_subject: HashMap<TypeId, Arc<dyn ErasedPolicy<A>>>,
    by_policy: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl<A: 'static> AuthorizerBuilder<A> {
    pub fn new() -> Self {
        Self {
            by_subject: HashMap::new(),
            by_policy: HashMap::new(),
        }
    }

    /// Registers `policy` as the policy of its subject type, with the allow-table
    /// returned by [`Policy::allow_rules`].
    pub fn register<P>(self, policy: P) -> Result<Self>
    where
        P: Policy<Actor = A>,
    {
        let rules = P::allow_rules()?;
        self.insert(policy, rules, true)
    }

    /// Registers `policy` as the policy of its subject type, with an externally
    /// loaded allow-table (e.g. [`AllowRules::from_json`]) in place of its own.
    pub fn register_with_rules<P>(self, policy: P, rules: AllowRules) -> Result<Self>
    where
        P: Policy<Actor = A>,
    {
        self.insert(policy, rules, true)
    }

    /// Registers `policy` for use with [`Authorizer::decide_as`] only.
    ///
    /// Lookup by subject type never resolves to an alternate policy.
    pub fn register_alternate<P>(self, policy: P) -> Result<Self>
    where
        P: Policy<Actor = A>,
    {
        let rules = P::allow_rules()?;
        self.insert(policy, rules, false)
    }

    pub fn build(self) -> Authorizer<A> {
        Authorizer {
            by_subject: self.by_subject,
            by_policy: self.by_policy,
        }
    }

    fn insert<P>(mut self, policy: P, rules: AllowRules, primary: bool) -> Result<Self>
    where
        P: Policy<Actor = A>,
    {
        let policy_type = TypeId::of::<P>();
        let subject_type = TypeId::of::<P::Subject>();

        if self.by_policy.contains_key(&policy_type) {
            return Err(Error::DuplicatePolicy {
                policy: simple_type_name::<P>(),
                subject_type: simple_type_name::<P::Subject>(),
            });
        }

        if primary {
            if let Some(existing) = self.by_subject.get(&subject_type) {
                return Err(Error::DuplicatePolicy {
                    policy: existing.policy_name(),
                    subject_type: simple_type_name::<P::Subject>(),
                });
            }
        }

        debug!(
            policy = simple_type_name::<P>(),
            subject_type = simple_type_name::<P::Subject>(),
            rules = rules.len(),
            primary,
            "registered policy"
        );

        let registration = Arc::new(Registration { policy, rules });
        if primary {
            let erased: Arc<dyn ErasedPolicy<A>> = registration.clone();
            self.by_subject.insert(subject_type, erased);
        }
        self.by_policy.insert(policy_type, registration);

        Ok(self)
    }
}

impl<A> fmt::Debug for AuthorizerBuilder<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizerBuilder")
            .field("policies", &policy_names(&self.by_subject))
            .field("registered", &self.by_policy.len())
            .finish()
    }
}

impl<A: 'static> Default for AuthorizerBuilder<A> {
    fn default() -> Self {
        Self::new()
    }
}
