use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

/// Anything addressable by a stable string identifier.
pub trait Entity {
    fn id(&self) -> &str;
}

/// Generated entities in generation order, with an id index for handlers.
///
/// Serializes as the plain list; the index is rebuilt on load.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityStore<T> {
    items: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T: Entity> EntityStore<T> {
    pub fn from_vec(items: Vec<T>) -> Self {
        let mut index = HashMap::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            index.entry(item.id().to_string()).or_insert(i);
        }
        Self { items, index }
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.index.get(id).map(|&i| &self.items[i])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        match self.index.get(id) {
            Some(&i) => self.items.get_mut(i),
            None => None,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a, T: Entity> IntoIterator for &'a EntityStore<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Serialize> Serialize for EntityStore<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

impl<'de, T: Entity + DeserializeOwned> Deserialize<'de> for EntityStore<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<T>::deserialize(deserializer).map(Self::from_vec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Crate {
        id: String,
        weight: u32,
    }

    impl Entity for Crate {
        fn id(&self) -> &str {
            &self.id
        }
    }

    fn store() -> EntityStore<Crate> {
        EntityStore::from_vec(vec![
            Crate {
                id: "b".into(),
                weight: 2,
            },
            Crate {
                id: "a".into(),
                weight: 1,
            },
        ])
    }

    #[test]
    fn keeps_order_and_indexes() {
        let mut s = store();
        assert_eq!(s.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(), ["b", "a"]);
        assert_eq!(s.get("a").map(|c| c.weight), Some(1));
        s.get_mut("b").unwrap().weight = 9;
        assert_eq!(s.as_slice()[0].weight, 9);
        assert!(s.get("z").is_none());
    }

    #[test]
    fn serializes_as_list_and_reindexes() {
        let s = store();
        let v = serde_json::to_value(&s).unwrap();
        assert!(v.is_array());
        let back: EntityStore<Crate> = serde_json::from_value(v).unwrap();
        assert_eq!(back, s);
        assert!(back.contains("a"));
    }
}
