//! Order service: placement, scoped reads and payment updates.

use std::sync::Arc;

use uuid::Uuid;

use crate::auth::{authorize, Action, Caller, Resource};
use crate::domain::aggregates::{Order, PaymentStatus};
use crate::domain::events::OrderCreated;
use crate::notify::OrderHooks;
use crate::repository::{CustomerRepository, OrderRepository, Store};
use crate::{Result, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    All,
    Customer(i64),
    Nothing,
}

impl Scope {
    fn allows(&self, order: &Order) -> bool {
        match self {
            Self::All => true,
            Self::Customer(id) => order.customer_id == *id,
            Self::Nothing => false,
        }
    }
}

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn Store>,
    hooks: OrderHooks,
}

impl OrderService {
    pub fn new(store: Arc<dyn Store>, hooks: OrderHooks) -> Self {
        Self { store, hooks }
    }

    /// Staff see every order. Anyone else sees their own customer's orders,
    /// which is none at all before they have a customer profile.
    async fn scope(&self, caller: &Caller) -> Result<Scope> {
        if caller.is_staff() {
            return Ok(Scope::All);
        }
        let user_id = caller.user_id().ok_or(StoreError::Unauthenticated)?;
        Ok(match self.store.get_customer_by_user(user_id).await? {
            Some(customer) => Scope::Customer(customer.id),
            None => Scope::Nothing,
        })
    }

    /// Converts the cart into an order owned by the caller. Listeners hear
    /// about it only after the order is committed.
    pub async fn place_order(&self, caller: &Caller, cart_id: Uuid) -> Result<Order> {
        authorize(caller, Action::Create, Resource::Order)?;
        let user_id = caller.user_id().ok_or(StoreError::Unauthenticated)?;

        let order = self.store.place_order(user_id, cart_id).await?;
        tracing::info!(order_id = order.id, customer_id = order.customer_id, %cart_id, "Placed order");

        self.hooks.dispatch(OrderCreated::from(&order));
        Ok(order)
    }

    pub async fn list_orders(&self, caller: &Caller) -> Result<Vec<Order>> {
        authorize(caller, Action::List, Resource::Order)?;
        match self.scope(caller).await? {
            Scope::All => self.store.list_orders(None).await,
            Scope::Customer(id) => self.store.list_orders(Some(id)).await,
            Scope::Nothing => Ok(vec![]),
        }
    }

    pub async fn get_order(&self, caller: &Caller, id: i64) -> Result<Order> {
        authorize(caller, Action::Retrieve, Resource::Order)?;
        let scope = self.scope(caller).await?;
        self.store
            .get_order(id)
            .await?
            .filter(|order| scope.allows(order))
            .ok_or(StoreError::NotFound("order"))
    }

    pub async fn update_payment_status(&self, caller: &Caller, id: i64, next: PaymentStatus) -> Result<Order> {
        authorize(caller, Action::Update, Resource::Order)?;
        let order = self.store.get_order(id).await?.ok_or(StoreError::NotFound("order"))?;
        let status = order.payment_status.transition(next)?;
        if status == order.payment_status {
            return Ok(order);
        }
        let order = self.store.set_payment_status(id, order.payment_status, status).await?;
        tracing::info!(order_id = id, status = ?status, "Updated payment status");
        Ok(order)
    }

    pub async fn delete_order(&self, caller: &Caller, id: i64) -> Result<()> {
        authorize(caller, Action::Delete, Resource::Order)?;
        self.store.delete_order(id).await?;
        tracing::info!(order_id = id, "Deleted order");
        Ok(())
    }

    /// Every order a customer has placed.
    pub async fn customer_history(&self, caller: &Caller, customer_id: i64) -> Result<Vec<Order>> {
        authorize(caller, Action::Retrieve, Resource::CustomerHistory)?;
        if self.store.get_customer(customer_id).await?.is_none() {
            return Err(StoreError::NotFound("customer"));
        }
        self.store.list_orders(Some(customer_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{NewCartItem, NewCollection, NewCustomer, NewProduct};
    use crate::notify::OrderListener;
    use crate::repository::{CartRepository, CollectionRepository, InMemoryStore, ProductRepository};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use tokio::sync::mpsc;

    const ALICE: Caller = Caller::User { user_id: 1, is_staff: false };
    const BOB: Caller = Caller::User { user_id: 2, is_staff: false };
    const ADMIN: Caller = Caller::User { user_id: 99, is_staff: true };

    struct Forward(mpsc::UnboundedSender<OrderCreated>);

    #[async_trait]
    impl OrderListener for Forward {
        fn name(&self) -> &str { "forward" }

        async fn order_created(&self, event: &OrderCreated) -> anyhow::Result<()> {
            self.0.send(event.clone())?;
            Ok(())
        }
    }

    struct Unreachable;

    #[async_trait]
    impl OrderListener for Unreachable {
        fn name(&self) -> &str { "unreachable" }

        async fn order_created(&self, _event: &OrderCreated) -> anyhow::Result<()> {
            anyhow::bail!("connection refused")
        }
    }

    async fn setup() -> (OrderService, Arc<InMemoryStore>, Uuid) {
        setup_with(OrderHooks::new()).await
    }

    async fn setup_with(hooks: OrderHooks) -> (OrderService, Arc<InMemoryStore>, Uuid) {
        let store = Arc::new(InMemoryStore::new());
        for user_id in [1, 2] {
            store
                .create_customer(NewCustomer {
                    user_id,
                    phone_number: "+998901234567".into(),
                    birth_date: None,
                    membership: Default::default(),
                })
                .await
                .unwrap();
        }
        let collection = store.create_collection(NewCollection { title: "Tea".into(), featured_product: None }).await.unwrap();
        let product = store
            .create_product(NewProduct {
                title: "Green tea".into(),
                slug: "green-tea".into(),
                description: None,
                price: dec!(12.50),
                inventory: 10,
                collection: collection.id,
                promotions: vec![],
            })
            .await
            .unwrap();
        let cart = store.create_cart().await.unwrap();
        store.add_cart_item(cart.id, NewCartItem { product_id: product.id, quantity: 2 }).await.unwrap();

        let service = OrderService::new(store.clone(), hooks);
        (service, store, cart.id)
    }

    #[tokio::test]
    async fn test_orders_are_scoped_to_owner() {
        let (service, _, cart_id) = setup().await;
        let order = service.place_order(&ALICE, cart_id).await.unwrap();
        assert_eq!(order.total_price(), dec!(25.00));

        assert_eq!(service.list_orders(&ALICE).await.unwrap().len(), 1);
        assert!(service.list_orders(&BOB).await.unwrap().is_empty());
        assert_eq!(service.list_orders(&ADMIN).await.unwrap().len(), 1);
        assert!(matches!(service.get_order(&BOB, order.id).await, Err(StoreError::NotFound("order"))));
        assert!(service.get_order(&ADMIN, order.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_placement_notifies_listeners_after_commit() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let hooks = OrderHooks::new().with(Unreachable).with(Forward(tx));
        let (service, store, cart_id) = setup_with(hooks).await;

        let order = service.place_order(&ALICE, cart_id).await.unwrap();
        assert_eq!(order.item_count(), 1);
        assert_eq!(order.total_price(), dec!(25.00));

        let event = rx.recv().await.unwrap();
        assert_eq!(event, OrderCreated::from(&order));
        assert_eq!(event.total, dec!(25.00));

        // The failing listener leaves the committed order in place.
        let listed = service.list_orders(&ALICE).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, order.id);
        assert!(store.get_cart(cart_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_placement_notifies_nobody() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (service, _, _) = setup_with(OrderHooks::new().with(Forward(tx))).await;

        assert!(service.place_order(&ALICE, Uuid::new_v4()).await.is_err());
        drop(service);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_payment_status_updates() {
        let (service, _, cart_id) = setup().await;
        let order = service.place_order(&ALICE, cart_id).await.unwrap();

        assert!(matches!(
            service.update_payment_status(&ALICE, order.id, PaymentStatus::Completed).await,
            Err(StoreError::Forbidden)
        ));
        let order = service.update_payment_status(&ADMIN, order.id, PaymentStatus::Completed).await.unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Completed);
        assert!(matches!(
            service.update_payment_status(&ADMIN, order.id, PaymentStatus::Failed).await,
            Err(StoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_anonymous_cannot_order() {
        let (service, store, cart_id) = setup().await;
        assert!(matches!(service.place_order(&Caller::Anonymous, cart_id).await, Err(StoreError::Unauthenticated)));
        assert!(store.get_cart(cart_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_customer_history_is_staff_only() {
        let (service, store, cart_id) = setup().await;
        service.place_order(&ALICE, cart_id).await.unwrap();
        let alice = store.get_customer_by_user(1).await.unwrap().unwrap();

        assert!(matches!(service.customer_history(&ALICE, alice.id).await, Err(StoreError::Forbidden)));
        assert_eq!(service.customer_history(&ADMIN, alice.id).await.unwrap().len(), 1);
    }
}
