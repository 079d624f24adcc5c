mod common;
use crate::common::with_timeout;

use runtree::CancelToken;

#[tokio::test]
async fn parent_cancellation_reaches_children() {
    let parent = CancelToken::new();
    let child = parent.child();
    let grandchild = child.child();

    let waiter = {
        let grandchild = grandchild.clone();
        tokio::spawn(async move { grandchild.cancelled().await })
    };

    parent.cancel();
    with_timeout(waiter).await.unwrap();
    assert!(child.is_cancelled());
    assert!(grandchild.is_cancelled());
}

#[tokio::test]
async fn child_cancellation_stays_local() {
    let parent = CancelToken::new();
    let child = parent.child();
    let sibling = parent.child();

    child.cancel();

    assert!(child.is_cancelled());
    assert!(!parent.is_cancelled());
    assert!(!sibling.is_cancelled());
}

#[tokio::test]
async fn child_of_cancelled_parent_starts_cancelled() {
    let parent = CancelToken::new();
    parent.cancel();
    let child = parent.child();

    assert!(child.is_cancelled());
    with_timeout(child.cancelled()).await;
}
