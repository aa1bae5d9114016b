
    use super::*;

    async fn open_store() -> MemoryJobStore {
        let store = MemoryJobStore::new();
        store.open().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_memory_store_requires_open() {
        let store = MemoryJobStore::new();
        assert!(!store.is_open());

        let result = store.insert("\"a\"".to_string()).await;
        assert!(matches!(result, Err(QueueError::NotOpen)));
    }

    #[tokio::test]
    async fn test_memory_store_ids_are_monotonic() {
        let store = open_store().await;

        let a = store.insert("\"a\"".to_string()).await.unwrap();
        let b = store.insert("\"b\"".to_string()).await.unwrap();
        store.delete(b).await.unwrap();
        let c = store.insert("\"c\"".to_string()).await.unwrap();

        assert!(a < b);
        assert!(b < c, "ids must never be reused");
    }

    #[tokio::test]
    async fn test_memory_store_head_is_ordered_and_bounded() {
        let store = open_store().await;
        for name in ["a", "b", "c", "d"] {
            store.insert(format!("\"{}\"", name)).await.unwrap();
        }

        let head = store.head(2).await.unwrap();
        assert_eq!(head.len(), 2);
        assert_eq!(head[0].payload, "\"a\"");
        assert_eq!(head[1].payload, "\"b\"");
        assert!(head[0].id < head[1].id);
    }

    #[tokio::test]
    async fn test_memory_store_count_follows_mutations() {
        let store = open_store().await;
        let a = store.insert("1".to_string()).await.unwrap();
        store.insert("2".to_string()).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);

        assert_eq!(store.delete(a).await.unwrap(), 1);
        assert_eq!(store.delete(a).await.unwrap(), 0);
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.count_rows().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_memory_store_find() {
        let store = open_store().await;
        let a = store.insert("\"x\"".to_string()).await.unwrap();
        store.insert("\"y\"".to_string()).await.unwrap();
        let c = store.insert("\"x\"".to_string()).await.unwrap();

        assert_eq!(store.find("\"x\"", None).await.unwrap(), vec![a, c]);
        assert_eq!(store.find("\"x\"", Some(1)).await.unwrap(), vec![a]);
        assert!(store.find("\"z\"", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_survives_reopen() {
        let store = open_store().await;
        let id = store.insert("\"kept\"".to_string()).await.unwrap();
        store.close().await.unwrap();
        assert!(matches!(store.contains(id).await, Err(QueueError::NotOpen)));

        store.open().await.unwrap();
        assert!(store.contains(id).await.unwrap());
        assert_eq!(store.count().await.unwrap(), 1);
    }
