// SPDX-License-Identifier: MIT OR Apache-2.0

/*!
Registry of publishing loggers.

Only loggers that were registered with a [Publisher], and children derived from them, have
entries here.  A child does not get a publisher of its own: its entry points at the same
publisher as its parent's entry.

Reference counts follow the handles:

- registering a publisher creates an entry with count 1, owned by the registering handle;
- deriving a child adds 1 to the parent's entry and 1 to the child's entry (creating it if
  needed);
- releasing a child subtracts 1 from both again, and releasing the owning handle subtracts 1
  from its own entry.

An entry is removed when its count reaches zero.  When the removed entry is the one the publisher
was registered under, the publisher is closed.
*/

use crate::error::LoggingError;
use crate::publish_sink::Publisher;
use crate::spinlock::RwSpinlock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug)]
struct Entry {
    publisher: Arc<dyn Publisher>,
    /// the entry this one was derived from; `None` for the registered owner
    parent: Option<Box<str>>,
    ref_count: usize,
}

#[derive(Debug, Default)]
pub struct PublisherRegistry {
    entries: RwSpinlock<HashMap<Box<str>, Entry>>,
}

impl PublisherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `publisher` for `name` with a reference count of 1.
    pub fn register(&self, name: &str, publisher: Arc<dyn Publisher>) -> Result<(), LoggingError> {
        self.entries.write(|entries| {
            if entries.contains_key(name) {
                return Err(LoggingError::PublisherAlreadyRegistered {
                    name: name.to_string(),
                });
            }
            entries.insert(
                Box::from(name),
                Entry {
                    publisher,
                    parent: None,
                    ref_count: 1,
                },
            );
            Ok(())
        })
    }

    /**
    Records that a handle for `child` was derived from a handle for `parent`.

    Fails without changing anything when `parent` has no entry.
    */
    pub fn derive(&self, parent: &str, child: &str) -> Result<(), LoggingError> {
        self.entries.write(|entries| {
            let Some(parent_entry) = entries.get_mut(parent) else {
                return Err(LoggingError::NoPublisherForAncestor {
                    ancestor: parent.to_string(),
                });
            };
            parent_entry.ref_count += 1;
            let publisher = parent_entry.publisher.clone();
            entries
                .entry(Box::from(child))
                .and_modify(|e| e.ref_count += 1)
                .or_insert_with(|| Entry {
                    publisher,
                    parent: Some(Box::from(parent)),
                    ref_count: 1,
                });
            Ok(())
        })
    }

    /**
    Releases one handle for `name`.

    Returns `false` if there was no entry.
    */
    pub fn release(&self, name: &str) -> bool {
        let mut closing = Vec::new();
        let found = self.entries.write(|entries| {
            let Some(parent) = decrement(entries, name, &mut closing) else {
                return false;
            };
            if let Some(parent) = parent {
                decrement(entries, &parent, &mut closing);
            }
            true
        });
        // outside the lock: a publisher may log while closing
        for publisher in closing {
            publisher.close();
        }
        found
    }

    /// The publisher broadcasting for `name`, if `name` is a publishing logger.
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Publisher>> {
        self.entries
            .read(|entries| entries.get(name).map(|e| e.publisher.clone()))
    }

    pub fn ref_count(&self, name: &str) -> Option<usize> {
        self.entries.read(|entries| entries.get(name).map(|e| e.ref_count))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.read(|entries| entries.contains_key(name))
    }

    pub fn len(&self) -> usize {
        self.entries.read(|entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every entry and closes every registered publisher.
    pub fn clear(&self) {
        let drained: Vec<Entry> = self
            .entries
            .write(|entries| entries.drain().map(|(_, e)| e).collect());
        for entry in drained {
            if entry.parent.is_none() {
                entry.publisher.close();
            }
        }
    }
}

/// Decrements `name`.  Returns `None` when absent, otherwise the entry's parent.
fn decrement(
    entries: &mut HashMap<Box<str>, Entry>,
    name: &str,
    closing: &mut Vec<Arc<dyn Publisher>>,
) -> Option<Option<Box<str>>> {
    let entry = entries.get_mut(name)?;
    entry.ref_count -= 1;
    let parent = entry.parent.clone();
    if entry.ref_count == 0 {
        if let Some(removed) = entries.remove(name) {
            if removed.parent.is_none() {
                closing.push(removed.publisher);
            }
        }
    }
    Some(parent)
}
