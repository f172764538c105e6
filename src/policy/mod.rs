//! Authorization rules for every endpoint.
//!
//! Everything here is a pure function of the caller (if any), the action and
//! the already-loaded resource. Identity resolution and existence checks
//! happen before the policy is consulted.
//!
//! | Action                     | Allowed when                                 |
//! |----------------------------|----------------------------------------------|
//! | read anything              | always, anonymous included                   |
//! | create/update/delete category | caller is Administrator                   |
//! | create article             | caller is Writer or Administrator            |
//! | update article             | caller owns the article                      |
//! | delete article             | caller owns the article or is Administrator  |
//! | update user                | caller is that user or an Administrator      |

use crate::database::models::{Article, Category, Role, User};
use crate::types::Action;

/// What a request acts on. Singular variants carry the loaded entity.
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    Users,
    User(&'a User),
    Categories,
    Category(&'a Category),
    Articles,
    Article(&'a Article),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    /// No identity was presented for an action that needs one.
    Unauthenticated,
    /// The identity is known but not permitted.
    Forbidden(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn into_result(self) -> Result<(), Denial> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(denial) => Err(denial),
        }
    }
}

pub const CATEGORY_ADMIN_ONLY: &str = "only Administrators can manage categories";
pub const ARTICLE_CREATE_ROLE: &str = "only Writers and Administrators can create articles";
pub const ARTICLE_UPDATE_OWNER: &str = "you can only modify articles created by you";
pub const ARTICLE_DELETE_OWNER_OR_ADMIN: &str =
    "you are not authenticated as administrator or this article doesn't belong to you";
pub const USER_UPDATE_SELF_OR_ADMIN: &str = "you can only update your own profile";
pub const NOT_PERMITTED: &str = "this action is not permitted";

pub fn authorize(caller: Option<&User>, action: Action, resource: Resource<'_>) -> Decision {
    if !action.is_mutation() {
        return Decision::Allow;
    }

    let Some(caller) = caller else {
        return Decision::Deny(Denial::Unauthenticated);
    };

    match (action, resource) {
        (Action::Create, Resource::Categories)
        | (Action::Update | Action::Delete, Resource::Category(_)) => {
            require(caller.is_administrator(), CATEGORY_ADMIN_ONLY)
        }
        (Action::Create, Resource::Articles) => require(
            matches!(caller.role, Role::Writer | Role::Administrator),
            ARTICLE_CREATE_ROLE,
        ),
        // Administrators do not override ownership on updates.
        (Action::Update, Resource::Article(article)) => {
            require(article.user_id == caller.id, ARTICLE_UPDATE_OWNER)
        }
        (Action::Delete, Resource::Article(article)) => require(
            article.user_id == caller.id || caller.is_administrator(),
            ARTICLE_DELETE_OWNER_OR_ADMIN,
        ),
        (Action::Update, Resource::User(target)) => require(
            target.id == caller.id || caller.is_administrator(),
            USER_UPDATE_SELF_OR_ADMIN,
        ),
        _ => forbid(NOT_PERMITTED),
    }
}

fn require(condition: bool, reason: &'static str) -> Decision {
    if condition {
        Decision::Allow
    } else {
        forbid(reason)
    }
}

fn forbid(reason: &'static str) -> Decision {
    Decision::Deny(Denial::Forbidden(reason))
}

/// Which field groups of a user record a permitted caller may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserUpdateScope {
    /// Name, birthdate, gender, picture and descriptions.
    pub profile: bool,
    pub role: bool,
}

/// Profile fields belong to their owner; the role belongs to Administrators.
pub fn user_update_scope(caller: &User, target: &User) -> UserUpdateScope {
    UserUpdateScope {
        profile: caller.id == target.id,
        role: caller.is_administrator(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(id: i64, role: Role) -> User {
        User {
            id,
            google_sub: format!("sub-{}", id),
            name: format!("User {}", id),
            birthdate: None,
            gender: String::new(),
            profile_picture_url: String::new(),
            description: String::new(),
            short_description: String::new(),
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn article(id: i64, owner: i64) -> Article {
        Article {
            id,
            user_id: owner,
            category_id: 1,
            title: "Title".to_string(),
            body: "Body".to_string(),
            image_url: String::new(),
            tags: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn category() -> Category {
        Category {
            id: 1,
            name: "Tech".to_string(),
            image_url: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    const ROLES: [Role; 3] = [Role::Reader, Role::Writer, Role::Administrator];

    #[test]
    fn reads_need_no_identity() {
        let a = article(1, 1);
        let c = category();
        let u = user(1, Role::Reader);
        for resource in [
            Resource::Users,
            Resource::User(&u),
            Resource::Categories,
            Resource::Category(&c),
            Resource::Articles,
            Resource::Article(&a),
        ] {
            assert_eq!(authorize(None, Action::Read, resource), Decision::Allow);
        }
    }

    #[test]
    fn mutations_without_identity_are_unauthenticated() {
        let a = article(1, 1);
        for action in [Action::Create, Action::Update, Action::Delete] {
            assert_eq!(
                authorize(None, action, Resource::Article(&a)),
                Decision::Deny(Denial::Unauthenticated)
            );
        }
        assert_eq!(
            authorize(None, Action::Create, Resource::Categories),
            Decision::Deny(Denial::Unauthenticated)
        );
    }

    #[test]
    fn categories_are_administrator_only() {
        let c = category();
        for role in ROLES {
            let caller = user(1, role);
            let expected = role == Role::Administrator;
            assert_eq!(
                authorize(Some(&caller), Action::Create, Resource::Categories).is_allowed(),
                expected
            );
            assert_eq!(
                authorize(Some(&caller), Action::Update, Resource::Category(&c)).is_allowed(),
                expected
            );
            assert_eq!(
                authorize(Some(&caller), Action::Delete, Resource::Category(&c)).is_allowed(),
                expected
            );
        }
    }

    #[test]
    fn category_denial_carries_reason() {
        let caller = user(1, Role::Writer);
        assert_eq!(
            authorize(Some(&caller), Action::Create, Resource::Categories),
            Decision::Deny(Denial::Forbidden(CATEGORY_ADMIN_ONLY))
        );
    }

    #[test]
    fn article_creation_needs_writer_or_administrator() {
        assert!(!authorize(Some(&user(1, Role::Reader)), Action::Create, Resource::Articles).is_allowed());
        assert!(authorize(Some(&user(1, Role::Writer)), Action::Create, Resource::Articles).is_allowed());
        assert!(
            authorize(Some(&user(1, Role::Administrator)), Action::Create, Resource::Articles)
                .is_allowed()
        );
    }

    #[test]
    fn only_owner_updates_article() {
        let a = article(10, 2);
        assert!(authorize(Some(&user(2, Role::Reader)), Action::Update, Resource::Article(&a)).is_allowed());
        for role in ROLES {
            assert_eq!(
                authorize(Some(&user(3, role)), Action::Update, Resource::Article(&a)),
                Decision::Deny(Denial::Forbidden(ARTICLE_UPDATE_OWNER))
            );
        }
    }

    #[test]
    fn owner_or_administrator_deletes_article() {
        let a = article(10, 2);
        assert!(authorize(Some(&user(2, Role::Writer)), Action::Delete, Resource::Article(&a)).is_allowed());
        assert!(
            authorize(Some(&user(9, Role::Administrator)), Action::Delete, Resource::Article(&a))
                .is_allowed()
        );
        assert_eq!(
            authorize(Some(&user(9, Role::Writer)), Action::Delete, Resource::Article(&a)),
            Decision::Deny(Denial::Forbidden(ARTICLE_DELETE_OWNER_OR_ADMIN))
        );
    }

    #[test]
    fn user_updates_are_self_or_administrator() {
        let target = user(5, Role::Reader);
        assert!(authorize(Some(&user(5, Role::Reader)), Action::Update, Resource::User(&target)).is_allowed());
        assert!(
            authorize(Some(&user(1, Role::Administrator)), Action::Update, Resource::User(&target))
                .is_allowed()
        );
        assert_eq!(
            authorize(Some(&user(6, Role::Writer)), Action::Update, Resource::User(&target)),
            Decision::Deny(Denial::Forbidden(USER_UPDATE_SELF_OR_ADMIN))
        );
    }

    #[test]
    fn unsupported_combinations_are_forbidden() {
        let admin = user(1, Role::Administrator);
        let c = category();
        let a = article(1, 1);
        assert!(!authorize(Some(&admin), Action::Create, Resource::Category(&c)).is_allowed());
        assert!(!authorize(Some(&admin), Action::Delete, Resource::Categories).is_allowed());
        assert!(!authorize(Some(&admin), Action::Create, Resource::Users).is_allowed());
        assert!(!authorize(Some(&admin), Action::Delete, Resource::User(&admin)).is_allowed());
        assert!(!authorize(Some(&admin), Action::Create, Resource::Article(&a)).is_allowed());
    }

    #[test]
    fn update_scope_splits_profile_and_role() {
        let reader = user(5, Role::Reader);
        let admin = user(1, Role::Administrator);

        assert_eq!(
            user_update_scope(&reader, &reader),
            UserUpdateScope { profile: true, role: false }
        );
        assert_eq!(
            user_update_scope(&admin, &reader),
            UserUpdateScope { profile: false, role: true }
        );
        assert_eq!(
            user_update_scope(&admin, &admin),
            UserUpdateScope { profile: true, role: true }
        );
    }
}
