use may_i::{impl_subject, AllowRules, Authorizer, Policy, Result};

struct User;

struct Article {
    title: String,
}

impl_subject!(Article);

struct ArticlePolicy;

impl Policy for ArticlePolicy {
    type Actor = User;
    type Subject = Article;
}

fn main() -> Result<()> {
    let json = r#"{
        "statements": [
            {
                "description": "Public pages",
                "allow": "anyone",
                "actions": ["index", "show"]
            },
            {
                "allow": "authenticated",
                "actions": ["comment"]
            }
        ]
    }"#;

    let rules = AllowRules::from_json(json)?;
    for (action, rule) in rules.iter() {
        println!("{}: {:?}", action, rule);
    }

    let authorizer = Authorizer::builder()
        .register_with_rules(ArticlePolicy, rules)?
        .build();

    let article = Article {
        title: "Release notes".into(),
    };

    for action in &["show", "comment", "publish"] {
        println!(
            "guest may {} `{}`: {}",
            action,
            article.title,
            authorizer.decide(None, action, &article)?
        );
        println!(
            "user may {} `{}`: {}",
            action,
            article.title,
            authorizer.decide(Some(&User), action, &article)?
        );
    }

    Ok(())
}
