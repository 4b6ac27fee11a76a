use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use aquabill_core::domain::customer::{Customer, CustomerId, CustomerUpdate, NewCustomer};
use aquabill_core::errors::DomainError;

use crate::repositories::{CustomerRepository, RepositoryError, SqlCustomerRepository};
use crate::DbPool;

/// Customer CRUD over a repository.
#[derive(Clone)]
pub struct CustomerRegistry {
    customers: Arc<dyn CustomerRepository>,
}

impl CustomerRegistry {
    pub fn new(pool: DbPool) -> Self {
        Self::with_repository(Arc::new(SqlCustomerRepository::new(pool)))
    }

    pub fn with_repository(customers: Arc<dyn CustomerRepository>) -> Self {
        Self { customers }
    }

    pub async fn add(&self, registration: NewCustomer) -> Result<Customer, RepositoryError> {
        let customer = registration.into_customer(Utc::now())?;
        self.customers.insert(&customer).await?;

        info!(
            event_name = "registry.customer.added",
            customer_id = %customer.id,
            "customer registered"
        );
        Ok(customer)
    }

    pub async fn update(
        &self,
        id: &CustomerId,
        changes: CustomerUpdate,
    ) -> Result<Customer, RepositoryError> {
        let mut customer = self.get(id).await?;
        if changes.is_empty() {
            return Ok(customer);
        }

        changes.apply(&mut customer, Utc::now())?;
        self.customers.update(&customer).await?;

        info!(
            event_name = "registry.customer.updated",
            customer_id = %customer.id,
            "customer updated"
        );
        Ok(customer)
    }

    pub async fn delete(&self, id: &CustomerId) -> Result<(), RepositoryError> {
        self.customers.delete(id).await?;

        info!(event_name = "registry.customer.deleted", customer_id = %id, "customer deleted");
        Ok(())
    }

    pub async fn get(&self, id: &CustomerId) -> Result<Customer, RepositoryError> {
        self.customers
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::CustomerNotFound(id.clone()).into())
    }

    pub async fn list(&self) -> Result<Vec<Customer>, RepositoryError> {
        self.customers.list().await
    }
}

#[cfg(test)]
mod tests {
    use aquabill_core::domain::customer::{CustomerId, CustomerUpdate, NewCustomer};
    use aquabill_core::errors::DomainError;

    use super::CustomerRegistry;
    use crate::repositories::test_support::setup;
    use crate::repositories::RepositoryError;

    fn registration(id: &str, name: &str) -> NewCustomer {
        NewCustomer { id: id.to_string(), name: name.to_string(), ..NewCustomer::default() }
    }

    #[tokio::test]
    async fn add_rejects_duplicates_and_blank_names() {
        let registry = CustomerRegistry::new(setup().await);
        registry.add(registration("C-1", "Ramesh")).await.expect("first add");

        assert!(matches!(
            registry.add(registration("C-1", "Other")).await,
            Err(RepositoryError::Domain(DomainError::DuplicateCustomer(_)))
        ));
        assert!(matches!(
            registry.add(registration("C-2", "   ")).await,
            Err(RepositoryError::Domain(DomainError::InvalidCustomer(_)))
        ));
        assert_eq!(registry.list().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn update_applies_partial_changes() {
        let registry = CustomerRegistry::new(setup().await);
        let added = registry
            .add(NewCustomer {
                address: Some("Rampur".to_string()),
                phone: Some("12345".to_string()),
                ..registration("C-1", "Ramesh")
            })
            .await
            .expect("add");

        let updated = registry
            .update(
                &added.id,
                CustomerUpdate {
                    name: Some("Ramesh Kumar".to_string()),
                    phone: Some(String::new()),
                    ..CustomerUpdate::default()
                },
            )
            .await
            .expect("update");

        assert_eq!(updated.name, "Ramesh Kumar");
        assert_eq!(updated.address.as_deref(), Some("Rampur"));
        assert_eq!(updated.phone, None);
        assert_eq!(registry.get(&added.id).await.expect("get"), updated);
    }

    #[tokio::test]
    async fn update_missing_customer_is_not_found() {
        let registry = CustomerRegistry::new(setup().await);

        assert!(matches!(
            registry
                .update(
                    &CustomerId::from("C-404"),
                    CustomerUpdate { name: Some("x".to_string()), ..CustomerUpdate::default() }
                )
                .await,
            Err(RepositoryError::Domain(DomainError::CustomerNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn delete_removes_customer() {
        let registry = CustomerRegistry::new(setup().await);
        let added = registry.add(registration("C-1", "Ramesh")).await.expect("add");

        registry.delete(&added.id).await.expect("delete");

        assert!(matches!(
            registry.get(&added.id).await,
            Err(RepositoryError::Domain(DomainError::CustomerNotFound(_)))
        ));
    }
}
