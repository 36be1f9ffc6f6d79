use std::collections::BTreeMap;

use serde::Deserialize;

use crate::{DefaultValidator, Error, Field, Result, RuleValidator};

/// Kind of declarative grant registered for an action.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AllowRule {
    /// Granted to guests and signed-in actors alike.
    Anyone,
    /// Granted only when an actor is present.
    Authenticated,
}

impl AllowRule {
    pub fn permits(self, authenticated: bool) -> bool {
        match self {
            AllowRule::Anyone => true,
            AllowRule::Authenticated => authenticated,
        }
    }
}

/// Frozen allow-table of one policy type.
///
/// Built once through [`AllowRulesBuilder`] (or loaded from json) and read-only
/// afterwards, so it can be shared between any number of concurrent checks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllowRules(BTreeMap<String, AllowRule>);

impl AllowRules {
    pub fn builder() -> AllowRulesBuilder<DefaultValidator> {
        AllowRulesBuilder::new()
    }

    /// Loads a table from a json definition, validated with [`DefaultValidator`].
    pub fn from_json(json: &str) -> Result<Self> {
        AllowRulesBuilder::new().from_json(json)?.build()
    }

    pub fn get(&self, action: &str) -> Option<AllowRule> {
        self.0.get(action).copied()
    }

    /// `true` if a rule for `action` exists and admits the caller.
    /// Actions without a rule are never permitted.
    pub fn permits(&self, action: &str, authenticated: bool) -> bool {
        self.get(action).is_some_and(|rule| rule.permits(authenticated))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, AllowRule)> + '_ {
        self.0.iter().map(|(action, rule)| (action.as_str(), *rule))
    }
}

/// Collects declarative grants for a policy type.
///
/// Registering an action twice overwrites the earlier rule kind.
pub struct AllowRulesBuilder<V> {
    validator: V,
    rules: Vec<(String, AllowRule)>,
}

impl AllowRulesBuilder<DefaultValidator> {
    pub fn new() -> Self {
        Self {
            validator: DefaultValidator,
            rules: Vec::new(),
        }
    }
}

impl Default for AllowRulesBuilder<DefaultValidator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> AllowRulesBuilder<V>
where
    V: RuleValidator,
{
    pub fn with_validator<W: RuleValidator>(self, validator: W) -> AllowRulesBuilder<W> {
        AllowRulesBuilder {
            validator,
            rules: self.rules,
        }
    }

    /// Grants `actions` regardless of whether an actor is present.
    pub fn allow_anyone_to<I, T>(self, actions: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.register(actions, AllowRule::Anyone)
    }

    /// Grants `actions` to any present actor; guests are denied.
    pub fn allow_authenticated_to<I, T>(self, actions: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.register(actions, AllowRule::Authenticated)
    }

    /// Same as [`allow_authenticated_to`](Self::allow_authenticated_to).
    pub fn allow<I, T>(self, actions: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.allow_authenticated_to(actions)
    }

    /// Appends the statements of a json definition, in document order.
    ///
    /// ```json
    /// {
    ///     "statements": [
    ///         { "allow": "anyone", "actions": ["index", "show"] },
    ///         { "description": "Members only", "allow": "authenticated", "actions": ["create"] }
    ///     ]
    /// }
    /// ```
    pub fn from_json(mut self, json: &str) -> Result<Self> {
        let definition: RulesDefinition =
            serde_json::from_str(json).map_err(Error::Deserializing)?;

        for statement in definition.statements {
            self.validator
                .validate(Field::Description, &statement.description)?;
            self = self.register(statement.actions, statement.allow);
        }

        Ok(self)
    }

    pub fn build(self) -> Result<AllowRules> {
        let mut rules = BTreeMap::new();
        for (action, rule) in self.rules {
            self.validator.validate(Field::Action, &action)?;
            // last registration wins.
            rules.insert(action, rule);
        }
        Ok(AllowRules(rules))
    }

    fn register<I, T>(mut self, actions: I, rule: AllowRule) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.rules
            .extend(actions.into_iter().map(|action| (action.into(), rule)));
        self
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RulesDefinition {
    statements: Vec<Statement>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statement {
    #[serde(default)]
    description: String,
    allow: AllowRule,
    actions: Vec<String>,
}
