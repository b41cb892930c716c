//! Integration tests for local copies

mod common;

use crate::common::{path, put, setup, setup_with, test_config};
use ::common::prelude::*;

#[tokio::test]
async fn test_second_read_is_a_cache_hit() {
    let env = setup();
    put(&env, "public/a.txt", "cached body").await;

    let first = env.backend.get_local_copy(&path("public/a.txt")).await.unwrap();
    assert_eq!(tokio::fs::read(first.path()).await.unwrap(), b"cached body");
    assert!(first.path().starts_with(env.cache_dir.path()));
    assert!(!first.is_temporary());

    let before = env.client.request_count();
    let second = env.backend.get_local_copy(&path("public/a.txt")).await.unwrap();
    assert_eq!(second.path(), first.path());
    assert_eq!(env.client.request_count(), before);
    assert_eq!(env.fetcher.fetch_count(), 1);
}

#[tokio::test]
async fn test_create_invalidates_local_copy() {
    let env = setup();
    put(&env, "public/a.txt", "old contents").await;
    let stale = env.backend.get_local_copy(&path("public/a.txt")).await.unwrap();
    let cached_at = stale.path().to_path_buf();

    put(&env, "public/a.txt", "new contents").await;
    assert!(!cached_at.exists());

    let fresh = env.backend.get_local_copy(&path("public/a.txt")).await.unwrap();
    assert_eq!(tokio::fs::read(fresh.path()).await.unwrap(), b"new contents");
    assert_eq!(env.fetcher.fetch_count(), 2);
}

#[tokio::test]
async fn test_copy_and_delete_invalidate() {
    let env = setup();
    put(&env, "public/a.txt", "aaa").await;
    put(&env, "public/b.txt", "bbb").await;
    let b = env.backend.get_local_copy(&path("public/b.txt")).await.unwrap();
    let b_cached = b.path().to_path_buf();

    let status = env
        .backend
        .copy(
            &path("public/a.txt"),
            &path("public/b.txt"),
            &ObjectHeaders::default(),
            false,
        )
        .await;
    assert!(status.is_ok());
    assert!(!b_cached.exists());
    let b = env.backend.get_local_copy(&path("public/b.txt")).await.unwrap();
    assert_eq!(tokio::fs::read(b.path()).await.unwrap(), b"aaa");

    assert!(env.backend.delete(&path("public/b.txt"), false).await.is_ok());
    assert!(!b.path().exists());
    assert!(env.backend.get_local_copy(&path("public/b.txt")).await.is_none());
}

#[tokio::test]
async fn test_missing_and_invalid_paths() {
    let env = setup();
    assert!(env.backend.get_local_copy(&path("public/absent.txt")).await.is_none());
    assert!(env.backend.get_local_copy(&path("nope/a.txt")).await.is_none());
    assert!(env.backend.get_local_copy(&path("ghost/a.txt")).await.is_none());
}

#[tokio::test]
async fn test_small_downloads_are_not_retained() {
    let env = setup_with(test_config(), 1024);
    put(&env, "public/tiny.txt", "tiny").await;

    let copy = env.backend.get_local_copy(&path("public/tiny.txt")).await.unwrap();
    assert!(copy.is_temporary());
    let temp = copy.path().to_path_buf();
    assert_eq!(tokio::fs::read(&temp).await.unwrap(), b"tiny");
    drop(copy);
    assert!(!temp.exists());

    // nothing was kept, so the next read downloads again
    let _again = env.backend.get_local_copy(&path("public/tiny.txt")).await.unwrap();
    assert_eq!(env.fetcher.fetch_count(), 2);
}

#[tokio::test]
async fn test_batch_results_keyed_by_path() {
    let env = setup();
    put(&env, "public/1.txt", "one").await;
    put(&env, "public/2.txt", "two").await;
    put(&env, "thumb/3.txt", "three").await;

    let paths = vec![
        path("public/1.txt"),
        path("public/absent.txt"),
        path("public/2.txt"),
        path("nope/x.txt"),
        path("thumb/3.txt"),
    ];
    let copies = env.backend.get_local_copies(&paths, 2).await;
    assert_eq!(copies.len(), 5);

    for (p, expected) in [
        ("public/1.txt", "one"),
        ("public/2.txt", "two"),
        ("thumb/3.txt", "three"),
    ] {
        let copy = copies[&path(p)].as_ref().unwrap();
        assert_eq!(tokio::fs::read(copy.path()).await.unwrap(), expected.as_bytes());
    }
    assert!(copies[&path("public/absent.txt")].is_none());
    assert!(copies[&path("nope/x.txt")].is_none());
}

#[tokio::test]
async fn test_batch_fetches_repeated_path_once() {
    let env = setup();
    put(&env, "public/a.txt", "only once").await;

    let a = path("public/a.txt");
    let copies = env
        .backend
        .get_local_copies(&[a.clone(), a.clone(), a.clone()], 3)
        .await;
    assert_eq!(copies.len(), 1);
    assert!(copies[&a].is_some());
    assert_eq!(env.fetcher.fetch_count(), 1);

    // repeats in later chunks reuse the earlier chunk's result
    let copies = env
        .backend
        .get_local_copies(&[path("public/a.txt"), a.clone(), a.clone()], 1)
        .await;
    assert!(copies[&a].is_some());
    assert_eq!(env.fetcher.fetch_count(), 1);
}

