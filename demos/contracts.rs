use may_i::{impl_subject, AllowRules, Authorizer, Error, Policy, Result, Scope};

struct User {
    name: String,
    project_manager: bool,
}

struct Contract {
    signed: bool,
}

struct Customer {
    delinquent: bool,
}

impl_subject!(Contract, Customer);

struct ContractPolicy;

impl Policy for ContractPolicy {
    type Actor = User;
    type Subject = Contract;

    fn allow_rules() -> Result<AllowRules> {
        AllowRules::builder()
            .allow_anyone_to(["create", "show"])
            .allow(["comment"])
            .build()
    }

    fn check(&self, action: &str, scope: &Scope<'_, User, Contract>) -> Result<Option<bool>> {
        Ok(match action {
            "update" => Some(
                scope.user().is_some_and(|user| user.project_manager)
                    || !scope.subject().signed,
            ),
            _ => None,
        })
    }
}

struct CustomerPolicy;

impl Policy for CustomerPolicy {
    type Actor = User;
    type Subject = Customer;

    fn allow_rules() -> Result<AllowRules> {
        AllowRules::builder().allow(["show"]).build()
    }
}

// a customer seen from the credit card perspective.
struct CustomerCreditCardPolicy;

impl Policy for CustomerCreditCardPolicy {
    type Actor = User;
    type Subject = Customer;

    fn check(&self, action: &str, scope: &Scope<'_, User, Customer>) -> Result<Option<bool>> {
        Ok(match action {
            "charge" => Some(scope.is_authenticated() && !scope.subject().delinquent),
            _ => None,
        })
    }
}

fn main() -> Result<()> {
    let authorizer = Authorizer::builder()
        .register(ContractPolicy)?
        .register(CustomerPolicy)?
        .register_alternate(CustomerCreditCardPolicy)?
        .build();

    let alice = User {
        name: "alice".into(),
        project_manager: false,
    };
    let signed = Contract { signed: true };

    for action in &["show", "comment", "update", "destroy"] {
        let allowed = authorizer.decide(Some(&alice), action, &signed)?;
        println!("{} may {} a signed contract: {}", alice.name, action, allowed);
    }

    // guests may create contracts.
    authorizer.authorize(None, "create", &Contract { signed: false })?;

    let customer = Customer { delinquent: false };
    println!(
        "{} may charge the customer: {}",
        alice.name,
        authorizer.decide_as::<CustomerCreditCardPolicy>(Some(&alice), "charge", &customer)?
    );

    match authorizer.authorize(None, "update", &signed) {
        Err(Error::Unauthorized { action, subject_type }) => {
            println!("guest denied: {} {}", action, subject_type)
        }
        other => panic!("expected a denial, got {:?}", other),
    }

    Ok(())
}
