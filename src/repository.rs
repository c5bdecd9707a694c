//! In-process subscription storage.

use crate::domain::{Frequency, Subscriber, Subscription};
use crate::ports::{RepositoryError, RepositoryResult, SubscriptionRepository};
use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

/// Subscription repository backed by a vector behind a lock.
///
/// Listing preserves insertion order.
///
/// ```
/// use skybell::domain::{Frequency, Subscription};
/// use skybell::ports::SubscriptionRepository;
/// use skybell::repository::InMemorySubscriptionRepository;
///
/// # tokio_test::block_on(async {
/// let repo = InMemorySubscriptionRepository::new();
/// let subscription = Subscription::new("alice@example.com", "Kyiv", Frequency::Daily);
/// repo.save(&subscription).await.unwrap();
/// repo.confirm(&subscription.confirmation_token).await.unwrap();
///
/// let daily = repo.get_confirmed_subscriptions(Frequency::Daily).await.unwrap();
/// assert_eq!(daily[0].city, "Kyiv");
/// # });
/// ```
#[derive(Debug, Default)]
pub struct InMemorySubscriptionRepository {
    subscriptions: RwLock<Vec<Subscription>>,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.subscriptions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.read().is_empty()
    }
}

fn same_city(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn save(&self, subscription: &Subscription) -> RepositoryResult<()> {
        let mut subscriptions = self.subscriptions.write();
        if subscriptions
            .iter()
            .any(|s| s.email == subscription.email && same_city(&s.city, &subscription.city))
        {
            return Err(RepositoryError::Duplicate {
                email: subscription.email.clone(),
                city: subscription.city.clone(),
            });
        }
        subscriptions.push(subscription.clone());
        debug!(email = %subscription.email, city = %subscription.city, "Saved subscription");
        Ok(())
    }

    async fn is_subscribed(&self, email: &str, city: &str) -> RepositoryResult<bool> {
        Ok(self
            .subscriptions
            .read()
            .iter()
            .any(|s| s.email == email && same_city(&s.city, city)))
    }

    async fn confirm(&self, token: &str) -> RepositoryResult<Subscription> {
        let mut subscriptions = self.subscriptions.write();
        let subscription = subscriptions
            .iter_mut()
            .find(|s| s.confirmation_token == token)
            .ok_or(RepositoryError::NotFound)?;
        subscription.confirm();
        Ok(subscription.clone())
    }

    async fn find_by_unsubscribe_token(&self, token: &str) -> RepositoryResult<Subscription> {
        self.subscriptions
            .read()
            .iter()
            .find(|s| s.unsubscribe_token == token)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn delete(&self, token: &str) -> RepositoryResult<()> {
        let mut subscriptions = self.subscriptions.write();
        let before = subscriptions.len();
        subscriptions.retain(|s| s.unsubscribe_token != token);
        if subscriptions.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn get_confirmed_subscriptions(
        &self,
        frequency: Frequency,
    ) -> RepositoryResult<Vec<Subscriber>> {
        Ok(self
            .subscriptions
            .read()
            .iter()
            .filter(|s| s.confirmed && s.frequency == frequency)
            .map(Subscription::subscriber)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_duplicate_rejected() {
        let repo = InMemorySubscriptionRepository::new();
        repo.save(&Subscription::new("a@x.com", "Kyiv", Frequency::Daily))
            .await
            .unwrap();

        let err = repo
            .save(&Subscription::new("a@x.com", "kyiv ", Frequency::Hourly))
            .await
            .unwrap_err();

        assert!(matches!(err, RepositoryError::Duplicate { .. }));
        assert!(repo.is_subscribed("a@x.com", "KYIV").await.unwrap());
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_only_confirmed_are_listed_in_order() {
        let repo = InMemorySubscriptionRepository::new();
        let first = Subscription::new("a@x.com", "Kyiv", Frequency::Daily);
        let second = Subscription::new("b@x.com", "Lviv", Frequency::Daily);
        let unconfirmed = Subscription::new("c@x.com", "Odesa", Frequency::Daily);
        let hourly = Subscription::new("d@x.com", "Dnipro", Frequency::Hourly);
        for s in [&first, &second, &unconfirmed, &hourly] {
            repo.save(s).await.unwrap();
        }

        repo.confirm(&second.confirmation_token).await.unwrap();
        repo.confirm(&first.confirmation_token).await.unwrap();
        repo.confirm(&hourly.confirmation_token).await.unwrap();

        let daily = repo.get_confirmed_subscriptions(Frequency::Daily).await.unwrap();
        let emails: Vec<_> = daily.iter().map(|s| s.email.as_str()).collect();
        assert_eq!(emails, ["a@x.com", "b@x.com"]);
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let repo = InMemorySubscriptionRepository::new();
        let subscription = Subscription::new("a@x.com", "Kyiv", Frequency::Daily);
        repo.save(&subscription).await.unwrap();

        let found = repo
            .find_by_unsubscribe_token(&subscription.unsubscribe_token)
            .await
            .unwrap();
        assert_eq!(found.id, subscription.id);

        repo.delete(&subscription.unsubscribe_token).await.unwrap();
        assert!(repo.is_empty());
        assert_eq!(
            repo.delete(&subscription.unsubscribe_token).await,
            Err(RepositoryError::NotFound)
        );
        assert_eq!(
            repo.confirm("missing").await.unwrap_err(),
            RepositoryError::NotFound
        );
    }
}
