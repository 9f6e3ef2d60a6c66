// Copyright 2023 Remi Bernotavicius

//! Change notification for the three brewing tables.
//!
//! Every committed write publishes the tables it touched. A [`LiveQuery`] keeps the last
//! result of a query together with a subscription, and only re-runs the query when one of
//! the tables it reads from has changed.

use crate::database::Database;
use crate::error::Result;
use std::collections::HashSet;
use std::sync::mpsc;

#[derive(Debug, Hash, Copy, Clone, PartialEq, Eq)]
pub enum Table {
    Recipes,
    Ingredients,
    RecipeIngredients,
}

#[derive(Default)]
pub(crate) struct ChangeFeed {
    subscribers: Vec<mpsc::Sender<Table>>,
}

impl ChangeFeed {
    pub(crate) fn subscribe(&mut self) -> Subscription {
        let (sender, receiver) = mpsc::channel();
        self.subscribers.push(sender);
        Subscription { receiver }
    }

    pub(crate) fn publish(&mut self, tables: &[Table]) {
        // A failed send means the subscription was dropped.
        self.subscribers
            .retain(|sender| tables.iter().all(|t| sender.send(*t).is_ok()));
    }

    #[cfg(test)]
    pub(crate) fn num_subscribers(&self) -> usize {
        self.subscribers.len()
    }
}

pub struct Subscription {
    receiver: mpsc::Receiver<Table>,
}

impl Subscription {
    pub fn changed_tables(&self) -> HashSet<Table> {
        self.receiver.try_iter().collect()
    }
}

pub trait Watchable {
    type Item;

    fn tables(&self) -> &'static [Table];

    fn load(&self, db: &mut Database) -> Result<Vec<Self::Item>>;
}

pub struct LiveQuery<Q: Watchable> {
    query: Q,
    subscription: Subscription,
    snapshot: Vec<Q::Item>,
    stale: bool,
}

impl<Q: Watchable> LiveQuery<Q> {
    pub fn new(db: &mut Database, query: Q) -> Self {
        Self {
            query,
            subscription: db.subscribe(),
            snapshot: vec![],
            stale: true,
        }
    }

    pub fn query(&self) -> &Q {
        &self.query
    }

    pub fn snapshot(&self) -> &[Q::Item] {
        &self.snapshot
    }

    pub fn set_query(&mut self, query: Q) {
        self.query = query;
        self.stale = true;
    }

    /// Re-runs the query if it has never run or a table it reads has changed. Returns true
    /// when the snapshot was replaced. On error the old snapshot is kept and the next call
    /// tries again.
    pub fn refresh(&mut self, db: &mut Database) -> Result<bool> {
        let changed = self.subscription.changed_tables();
        if !self.stale && !self.query.tables().iter().any(|t| changed.contains(t)) {
            return Ok(false);
        }
        self.stale = true;
        let items = self.query.load(db).inspect_err(|e| {
            log::warn!("live query refresh failed: {e}");
        })?;
        self.snapshot = items;
        self.stale = false;
        Ok(true)
    }
}

#[test]
fn dropped_subscriptions_are_pruned() {
    let mut feed = ChangeFeed::default();
    let kept = feed.subscribe();
    let dropped = feed.subscribe();
    drop(dropped);

    feed.publish(&[Table::Recipes, Table::RecipeIngredients]);
    assert_eq!(feed.num_subscribers(), 1);
    assert_eq!(
        kept.changed_tables(),
        maplit::hashset! { Table::Recipes, Table::RecipeIngredients }
    );
    assert!(kept.changed_tables().is_empty());
}
