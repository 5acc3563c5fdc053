mod common;

use uuid::Uuid;

use quill_core::DomainError;
use quill_core::services::PostInput;

use common::{harness, register};

fn input(title: &str) -> PostInput {
    PostInput {
        title: title.to_string(),
        content: format!("{title} body"),
    }
}

#[tokio::test]
async fn create_sets_author_from_requester() {
    let h = harness();
    let jane = register(&h, "jane").await;

    let view = h.posts.create(jane.id, input("Hello")).await.unwrap();

    assert_eq!(view.post.author_id, jane.id);
    assert_eq!(view.author, "jane");
    assert_eq!(view.post.date_posted, view.post.updated_at);

    let fetched = h.posts.get(view.post.id).await.unwrap();
    assert_eq!(fetched, view);
}

#[tokio::test]
async fn create_validates_fields() {
    let h = harness();
    let jane = register(&h, "jane").await;

    let err = h
        .posts
        .create(
            jane.id,
            PostInput {
                title: " ".to_string(),
                content: String::new(),
            },
        )
        .await
        .unwrap_err();

    let DomainError::Validation(errors) = err else {
        panic!("expected validation error");
    };
    assert!(errors.has("title"));
    assert!(errors.has("content"));
}

#[tokio::test]
async fn listing_is_paginated_newest_first() {
    let h = harness();
    let jane = register(&h, "jane").await;
    for i in 0..7 {
        h.posts.create(jane.id, input(&format!("post {i}"))).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    let first = h.posts.list(None).await.unwrap();
    assert_eq!(first.items.len(), 5);
    assert_eq!(first.items[0].post.title, "post 6");
    assert_eq!(first.num_pages, 2);
    assert!(first.has_next);

    let last = h.posts.list(Some("last")).await.unwrap();
    let titles: Vec<_> = last.items.iter().map(|v| v.post.title.as_str()).collect();
    assert_eq!(titles, vec!["post 1", "post 0"]);

    assert!(matches!(
        h.posts.list(Some("3")).await,
        Err(DomainError::NotFound { .. })
    ));
    assert!(matches!(
        h.posts.list(Some("two")).await,
        Err(DomainError::NotFound { .. })
    ));
}

#[tokio::test]
async fn empty_listing_serves_first_page() {
    let h = harness();
    let page = h.posts.list(Some("1")).await.unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.num_pages, 1);
}

#[tokio::test]
async fn list_by_author_filters_and_requires_existing_user() {
    let h = harness();
    let jane = register(&h, "jane").await;
    let bob = register(&h, "bob").await;
    h.posts.create(jane.id, input("jane's")).await.unwrap();
    h.posts.create(bob.id, input("bob's")).await.unwrap();

    let page = h.posts.list_by_author("bob", None).await.unwrap();
    assert_eq!(page.total_items, 1);
    assert_eq!(page.items[0].author, "bob");

    assert!(matches!(
        h.posts.list_by_author("ghost", None).await,
        Err(DomainError::NotFound { entity_type: "user", .. })
    ));
}

#[tokio::test]
async fn only_the_author_may_edit_or_delete() {
    let h = harness();
    let jane = register(&h, "jane").await;
    let bob = register(&h, "bob").await;
    let post = h.posts.create(jane.id, input("Mine")).await.unwrap().post;

    assert!(matches!(
        h.posts.update(bob.id, post.id, input("Hijacked")).await,
        Err(DomainError::Forbidden)
    ));
    assert!(matches!(
        h.posts.delete(bob.id, post.id).await,
        Err(DomainError::Forbidden)
    ));

    let updated = h.posts.update(jane.id, post.id, input("Edited")).await.unwrap();
    assert_eq!(updated.post.title, "Edited");
    assert_eq!(updated.post.date_posted, post.date_posted);
    assert!(updated.post.updated_at >= post.updated_at);

    h.posts.delete(jane.id, post.id).await.unwrap();
    assert!(matches!(
        h.posts.get(post.id).await,
        Err(DomainError::NotFound { entity_type: "post", .. })
    ));
}

#[tokio::test]
async fn missing_post_is_not_found_before_permission_check() {
    let h = harness();
    let jane = register(&h, "jane").await;
    let missing = Uuid::new_v4();

    assert!(matches!(
        h.posts.update(jane.id, missing, input("x")).await,
        Err(DomainError::NotFound { .. })
    ));
    assert!(matches!(
        h.posts.delete(jane.id, missing).await,
        Err(DomainError::NotFound { .. })
    ));
}
