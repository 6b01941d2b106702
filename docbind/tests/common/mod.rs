#![allow(dead_code)]

use docbind::{
    bson::Bson,
    memory::InMemoryStore,
    prelude::*,
};

pub struct Post;

impl Schema for Post {
    fn collection_name() -> &'static str {
        "posts"
    }

    fn fields() -> Vec<FieldDef> {
        vec![
            FieldDef::new("title", FieldKind::String),
            FieldDef::new("body", FieldKind::String).optional(),
            FieldDef::new("views", FieldKind::Int).with_default(0),
            FieldDef::new("tags", FieldKind::Array(Box::new(FieldKind::String))).optional(),
        ]
    }

    fn virtuals() -> Vec<Virtual<Self>> {
        vec![
            Virtual::new("title_length", |post| {
                Bson::Int64(post.get_str("title").map(|title| title.len() as i64).unwrap_or(0))
            }),
            // Shadowed by the persisted field of the same name.
            Virtual::new("views", |_| Bson::Int32(-1)),
        ]
    }
}

pub struct Author;

impl Schema for Author {
    fn collection_name() -> &'static str {
        "authors"
    }

    fn fields() -> Vec<FieldDef> {
        vec![
            FieldDef::new("name", FieldKind::String),
            FieldDef::new("email", FieldKind::String)
                .validated_by(|value| value.as_str().is_some_and(|email| email.contains('@'))),
        ]
    }
}

pub fn session() -> Session {
    Session::new(InMemoryStore::new())
}

pub async fn save_post(session: &Session, title: &str, views: i32) -> DocumentStoreResult<Model<Post>> {
    let mut post = session.create::<Post>();
    post.set("title", title).set("views", views);
    post.save().await?;
    Ok(post)
}

/// Saves `count` posts titled `post 0`, `post 1`, ... with `views` equal to their index.
pub async fn seed_posts(session: &Session, count: i32) -> DocumentStoreResult<Vec<Model<Post>>> {
    let mut posts = Vec::new();
    for index in 0..count {
        posts.push(save_post(session, &format!("post {index}"), index).await?);
    }
    Ok(posts)
}
