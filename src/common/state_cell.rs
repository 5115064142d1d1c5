// src/common/state_cell.rs

use std::{
    collections::HashMap,
    hash::Hash,
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

use tokio::sync::watch;

/// Estado compartilhado do processo com ciclo de vida explícito:
/// criado junto com o serviço, alterado só pelos setters, limpo em troca de contexto.
/// O `watch` serializa os escritores, então vários handlers podem mexer ao mesmo tempo.
pub struct StateCell<T> {
    tx: watch::Sender<T>,
}

impl<T: Clone> StateCell<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Lê sem clonar o valor inteiro.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.tx.borrow())
    }

    pub fn set(&self, value: T) {
        self.tx.send_replace(value);
    }

    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.tx.send_modify(f);
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}

impl<T: Clone + Default> StateCell<T> {
    pub fn clear(&self) {
        self.set(T::default());
    }
}

impl<T: Clone + Default> Default for StateCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

// =========================================================================
//  CACHE POR CHAVE
// =========================================================================

#[derive(Clone)]
struct Entry<V> {
    value: V,
    stored_at: Instant,
}

/// Cache por chave com validade. Cada leitura que erra o cache pega um `ticket`
/// antes de ir ao backend; `put` com um ticket anterior a um `forget`/`clear` é descartado.
pub struct KeyedCache<K, V> {
    cell: StateCell<HashMap<K, Entry<V>>>,
    ttl: Duration,
    generation: AtomicU64,
}

impl<K, V> KeyedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self { cell: StateCell::new(HashMap::new()), ttl, generation: AtomicU64::new(0) }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.cell.read(|map| {
            map.get(key)
                .filter(|entry| entry.stored_at.elapsed() < self.ttl)
                .map(|entry| entry.value.clone())
        })
    }

    pub fn ticket(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Grava o valor lido com `ticket`. Aproveita para descartar entradas vencidas.
    pub fn put(&self, key: K, value: V, ticket: u64) {
        self.cell.update(|map| {
            if self.generation.load(Ordering::SeqCst) != ticket {
                return;
            }
            map.retain(|_, entry| entry.stored_at.elapsed() < self.ttl);
            map.insert(key, Entry { value, stored_at: Instant::now() });
        });
    }

    pub fn forget(&self, key: &K) {
        self.cell.update(|map| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            map.remove(key);
        });
    }

    pub fn clear(&self) {
        self.cell.update(|map| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            map.clear();
        });
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.cell.read(|map| map.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn subscribers_see_updates() {
        let cell: StateCell<HashMap<&str, u32>> = StateCell::default();
        let mut rx = cell.subscribe();

        cell.update(|map| {
            map.insert("a", 1);
        });

        rx.changed().await.expect("sender alive");
        assert_eq!(rx.borrow().get("a"), Some(&1));
        assert_eq!(cell.read(|map| map.len()), 1);
    }

    #[test]
    fn clear_resets_to_default() {
        let cell = StateCell::new(vec![1, 2, 3]);
        cell.set(vec![4]);
        assert_eq!(cell.get(), vec![4]);

        cell.clear();
        assert!(cell.get().is_empty());
    }

    #[test]
    fn stale_reads_do_not_overwrite_an_invalidation() {
        let cache: KeyedCache<u32, &str> = KeyedCache::new(Duration::from_secs(60));

        let ticket = cache.ticket();
        // Outro escritor invalida enquanto a leitura estava no backend
        cache.forget(&1);
        cache.put(1, "antigo", ticket);
        assert_eq!(cache.get(&1), None);

        cache.put(1, "novo", cache.ticket());
        assert_eq!(cache.get(&1), Some("novo"));
    }

    #[test]
    fn expired_entries_are_misses_and_get_pruned() {
        let cache: KeyedCache<u32, u32> = KeyedCache::new(Duration::ZERO);
        cache.put(1, 10, cache.ticket());
        assert_eq!(cache.get(&1), None);

        cache.put(2, 20, cache.ticket());
        assert_eq!(cache.len(), 1);
    }
}
