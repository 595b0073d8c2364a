//! Unit of Work pattern implementation.
//!
//! Centralizes access to every repository and runs multi-statement writes
//! (request creation, request fulfillment) inside one database transaction.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{
    AccessMode, DatabaseConnection, DatabaseTransaction, IsolationLevel, TransactionTrait,
};

use crate::crypto::FieldCipher;
use crate::repository::{
    DonationRepository, DonationRequestRepository, DonationRequestStore, DonationStore,
    MealRepository, MealStore, TxDonationRepository, TxDonationRequestRepository, UserRepository,
    UserStore,
};
use common::{AppError, AppResult};

/// Boxed transactional closure body.
pub type TxFuture<'a, T> = Pin<Box<dyn Future<Output = AppResult<T>> + Send + 'a>>;

/// Unit of Work trait for dependency injection.
///
/// Provides centralized access to all repositories and transaction management.
/// The generic `transaction` method keeps this trait out of `dyn`; services
/// that need it are generic over the implementation.
#[async_trait]
pub trait UnitOfWork: Send + Sync + 'static {
    /// Get user repository
    fn users(&self) -> Arc<dyn UserRepository>;

    /// Get meal repository
    fn meals(&self) -> Arc<dyn MealRepository>;

    /// Get donation repository
    fn donations(&self) -> Arc<dyn DonationRepository>;

    /// Get donation request repository
    fn requests(&self) -> Arc<dyn DonationRequestRepository>;

    /// Execute a closure within a transaction.
    ///
    /// The transaction is committed when the closure returns `Ok` and rolled
    /// back otherwise.
    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send;
}

/// Transaction context providing repository access within a transaction.
///
/// All repository operations performed through this context are part
/// of the same database transaction.
pub struct TransactionContext<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TransactionContext<'a> {
    /// Create a new transaction context
    fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    /// Get donation repository for this transaction
    pub fn donations(&self) -> TxDonationRepository<'a> {
        TxDonationRepository::new(self.txn)
    }

    /// Get donation request repository for this transaction
    pub fn requests(&self) -> TxDonationRequestRepository<'a> {
        TxDonationRequestRepository::new(self.txn)
    }
}

/// Concrete implementation of UnitOfWork
pub struct Persistence {
    db: DatabaseConnection,
    user_repo: Arc<UserStore>,
    meal_repo: Arc<MealStore>,
    donation_repo: Arc<DonationStore>,
    request_repo: Arc<DonationRequestStore>,
}

impl Persistence {
    /// Create new UnitOfWork instance
    pub fn new(db: DatabaseConnection, cipher: FieldCipher) -> Self {
        Self {
            user_repo: Arc::new(UserStore::new(db.clone(), cipher)),
            meal_repo: Arc::new(MealStore::new(db.clone())),
            donation_repo: Arc::new(DonationStore::new(db.clone())),
            request_repo: Arc::new(DonationRequestStore::new(db.clone())),
            db,
        }
    }
}

#[async_trait]
impl UnitOfWork for Persistence {
    fn users(&self) -> Arc<dyn UserRepository> {
        self.user_repo.clone()
    }

    fn meals(&self) -> Arc<dyn MealRepository> {
        self.meal_repo.clone()
    }

    fn donations(&self) -> Arc<dyn DonationRepository> {
        self.donation_repo.clone()
    }

    fn requests(&self) -> Arc<dyn DonationRequestRepository> {
        self.request_repo.clone()
    }

    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send,
    {
        // Correctness of claims rests on the conditional UPDATE, not on isolation
        let txn = self
            .db
            .begin_with_config(Some(IsolationLevel::ReadCommitted), Some(AccessMode::ReadWrite))
            .await
            .map_err(AppError::from)?;

        let ctx = TransactionContext::new(&txn);

        match f(ctx).await {
            Ok(result) => {
                txn.commit().await.map_err(AppError::from)?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!("Transaction rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}

/// Run a transactional block with less boilerplate.
#[macro_export]
macro_rules! with_transaction {
    ($uow:expr, |$ctx:ident| $body:expr) => {
        $uow.transaction(|$ctx| Box::pin(async move { $body })).await
    };
}
