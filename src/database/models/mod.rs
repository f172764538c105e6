pub mod article;
pub mod category;
pub mod user;

pub use article::{Article, ArticleDetail, NewArticle};
pub use category::{Category, NewCategory};
pub use user::{NewUser, Role, User};
