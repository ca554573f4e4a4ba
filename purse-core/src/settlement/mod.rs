//! Settlement Engine.
//!
//! Every balance change goes through here, inside one [`LedgerUnit`]:
//!
//! - deposit initiation opens a gateway charge, then records a `pending` row
//! - deposit settlement re-verifies the charge with the gateway, locks the
//!   wallet, credits it and flips the row to `success`
//! - transfers lock both wallets in ascending id order, debit, credit and
//!   record both legs
//!
//! The engine keeps no balance state of its own. Every balance it decides on
//! is read under the row lock that guards the following write.

mod error;
pub mod reference;


pub use error::{ErrorKind, SettlementError, WalletLookup};

use crate::entities::transactions::{LedgerTransaction, TransactionInsert};
use crate::entities::users::{NewUser, User};
use crate::entities::wallets::Wallet;
use crate::entities::{TransactionKind, TransactionStatus};
use crate::gateway::{ChargeState, PaymentGateway};
use crate::store::{LedgerStore, LedgerUnit};
use purse_sdk::amount::{normalize_positive, to_minor_units};
use purse_sdk::objects::clamp_pagination;
use purse_sdk::objects::paystack::WebhookEvent;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const DEPOSIT_DESCRIPTION: &str = "Wallet deposit via Paystack";

/// A deposit waiting for the payer to complete checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositInitiated {
    pub transaction_id: Uuid,
    pub reference: String,
    pub external_reference: String,
    pub authorization_url: String,
}

/// What happened to a deposit event that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepositEventOutcome {
    /// Not a charge-success event; acknowledged without action.
    Ignored,
    /// The transaction was already `success`; nothing was written.
    AlreadySettled { transaction_id: Uuid },
    /// The wallet was credited and the transaction is now `success`.
    Settled {
        transaction_id: Uuid,
        wallet_id: Uuid,
        balance: Decimal,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub debit: LedgerTransaction,
    pub credit: LedgerTransaction,
    /// Sender's balance after the transfer.
    pub sender_balance: Decimal,
}

pub struct SettlementEngine<S, G> {
    store: S,
    gateway: G,
}

impl<S: LedgerStore, G: PaymentGateway> SettlementEngine<S, G> {
    pub fn new(store: S, gateway: G) -> Self {
        Self { store, gateway }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Create a user and their wallet together.
    #[tracing::instrument(skip_all, err, fields(email = %new_user.email))]
    pub async fn provision_account(
        &self,
        new_user: NewUser,
    ) -> Result<(User, Wallet), SettlementError> {
        let (user, wallet) = self.store.provision_user(new_user).await?;
        info!(user_id = %user.id, wallet_number = %wallet.wallet_number, "Account provisioned");
        Ok((user, wallet))
    }

    /// Open a gateway charge and record it as a pending deposit.
    ///
    /// Nothing is persisted if the gateway call fails.
    #[tracing::instrument(skip(self), err)]
    pub async fn initiate_deposit(
        &self,
        user_id: Uuid,
        amount: Decimal,
    ) -> Result<DepositInitiated, SettlementError> {
        let (amount, amount_minor) = normalize_positive(amount)?;

        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or(SettlementError::UserNotFound(user_id))?;
        let wallet = self
            .store
            .find_wallet_by_user(user_id)
            .await?
            .ok_or(SettlementError::WalletNotFound(WalletLookup::User(user_id)))?;

        let reference = reference::deposit_reference();
        let charge = self
            .gateway
            .open_charge(&user.email, amount_minor, &reference)
            .await?;

        let mut unit = self.store.begin().await?;
        let record = unit
            .insert_transaction(TransactionInsert {
                user_id,
                wallet_id: wallet.id,
                kind: TransactionKind::Deposit,
                amount,
                status: TransactionStatus::Pending,
                reference: reference.clone(),
                external_reference: Some(charge.external_reference.clone()),
                counterparty_wallet_id: None,
                counterparty_user_id: None,
                description: Some(DEPOSIT_DESCRIPTION.to_string()),
            })
            .await?;
        unit.commit().await?;

        info!(
            user_id = %user_id,
            reference = %reference,
            external_reference = %charge.external_reference,
            amount = %amount,
            "Deposit initiated"
        );
        Ok(DepositInitiated {
            transaction_id: record.id,
            reference,
            external_reference: charge.external_reference,
            authorization_url: charge.authorization_url,
        })
    }

    /// Check a raw webhook delivery's signature, parse it, and settle.
    ///
    /// The signature is checked against the exact bytes received, before
    /// any parsing.
    pub async fn ingest_deposit_event(
        &self,
        raw_body: &[u8],
        signature: Option<&str>,
    ) -> Result<DepositEventOutcome, SettlementError> {
        let signature = signature.ok_or(SettlementError::MissingSignature)?;
        if !self.gateway.verify_signature(raw_body, signature) {
            warn!(body_len = raw_body.len(), "Rejected webhook with bad signature");
            return Err(SettlementError::InvalidSignature);
        }
        let event: WebhookEvent = serde_json::from_slice(raw_body)?;
        self.process_deposit_event(&event).await
    }

    /// Settle a deposit from an authenticated gateway event.
    ///
    /// Replays of an already-settled deposit return
    /// [`DepositEventOutcome::AlreadySettled`] without writing anything. A
    /// deposit the gateway once reported `failed` is verified again, since
    /// the payer may retry on the same checkout.
    #[tracing::instrument(skip_all, err, fields(event = %event.event, external_reference))]
    pub async fn process_deposit_event(
        &self,
        event: &WebhookEvent,
    ) -> Result<DepositEventOutcome, SettlementError> {
        if !event.is_charge_success() {
            debug!("Ignoring non charge-success event");
            return Ok(DepositEventOutcome::Ignored);
        }
        let charge = event.charge_data()?;
        let external_reference = charge.reference.as_str();
        tracing::Span::current().record("external_reference", external_reference);

        let txn = self
            .store
            .find_transaction_by_external_reference(external_reference)
            .await?
            .filter(|t| t.kind == TransactionKind::Deposit)
            .ok_or(SettlementError::TransactionNotFound)?;
        let expected_minor = to_minor_units(txn.amount)?;

        if txn.status == TransactionStatus::Success {
            if let Some(event_amount) = charge.amount.filter(|a| *a != expected_minor) {
                warn!(
                    transaction_id = %txn.id,
                    event_amount,
                    expected_amount = expected_minor,
                    "Replayed event disagrees with settled amount"
                );
            }
            return Ok(DepositEventOutcome::AlreadySettled {
                transaction_id: txn.id,
            });
        }

        let verification = self.gateway.verify_charge(external_reference).await?;
        match verification.state {
            ChargeState::Settled => {}
            ChargeState::Failed => {
                self.mark_failed(&txn).await?;
                return Err(SettlementError::VerificationFailed {
                    external_reference: external_reference.to_owned(),
                });
            }
            ChargeState::Unsettled => {
                return Err(SettlementError::VerificationFailed {
                    external_reference: external_reference.to_owned(),
                });
            }
        }
        if verification.amount_minor != expected_minor {
            return Err(SettlementError::VerificationMismatch {
                external_reference: external_reference.to_owned(),
                expected_minor,
                reported_minor: verification.amount_minor,
            });
        }

        let mut unit = self.store.begin().await?;
        let balance = unit.lock_wallet_for_update(txn.wallet_id).await?;
        let new_balance = balance + txn.amount;
        let flipped = unit
            .update_transaction_status(txn.id, TransactionStatus::Pending, TransactionStatus::Success)
            .await?
            || unit
                .update_transaction_status(txn.id, TransactionStatus::Failed, TransactionStatus::Success)
                .await?;
        if !flipped {
            // Another delivery settled it while we were verifying.
            debug!(transaction_id = %txn.id, "Deposit settled concurrently");
            return Ok(DepositEventOutcome::AlreadySettled {
                transaction_id: txn.id,
            });
        }
        unit.set_balance(txn.wallet_id, new_balance).await?;
        unit.commit().await?;

        info!(
            transaction_id = %txn.id,
            wallet_id = %txn.wallet_id,
            amount = %txn.amount,
            balance = %new_balance,
            previous_status = ?txn.status,
            "Deposit settled"
        );
        Ok(DepositEventOutcome::Settled {
            transaction_id: txn.id,
            wallet_id: txn.wallet_id,
            balance: new_balance,
        })
    }

    /// Record the gateway's `failed` verdict on a pending deposit. Not
    /// terminal: a later settled verification still credits it.
    async fn mark_failed(&self, txn: &LedgerTransaction) -> Result<(), SettlementError> {
        let mut unit = self.store.begin().await?;
        unit.lock_wallet_for_update(txn.wallet_id).await?;
        if unit
            .update_transaction_status(txn.id, TransactionStatus::Pending, TransactionStatus::Failed)
            .await?
        {
            unit.commit().await?;
            warn!(transaction_id = %txn.id, "Gateway reports charge failed");
        }
        Ok(())
    }

    /// Move `amount` from the sender's wallet to the wallet numbered
    /// `recipient_wallet_number`.
    #[tracing::instrument(skip(self), err)]
    pub async fn transfer(
        &self,
        sender_user_id: Uuid,
        recipient_wallet_number: &str,
        amount: Decimal,
    ) -> Result<TransferReceipt, SettlementError> {
        let (amount, _) = normalize_positive(amount)?;

        let sender = self
            .store
            .find_wallet_by_user(sender_user_id)
            .await?
            .ok_or(SettlementError::WalletNotFound(WalletLookup::User(
                sender_user_id,
            )))?;
        let recipient = self
            .store
            .find_wallet_by_number(recipient_wallet_number)
            .await?
            .ok_or_else(|| {
                SettlementError::WalletNotFound(WalletLookup::Number(
                    recipient_wallet_number.to_owned(),
                ))
            })?;
        if sender.id == recipient.id {
            return Err(SettlementError::SelfTransfer);
        }

        let mut unit = self.store.begin().await?;

        // Lock order is by wallet id, never by role, so opposite transfers
        // between the same pair cannot wait on each other.
        let (first, second) = if sender.id < recipient.id {
            (sender.id, recipient.id)
        } else {
            (recipient.id, sender.id)
        };
        let first_balance = unit.lock_wallet_for_update(first).await?;
        let second_balance = unit.lock_wallet_for_update(second).await?;
        let (sender_balance, recipient_balance) = if first == sender.id {
            (first_balance, second_balance)
        } else {
            (second_balance, first_balance)
        };

        if sender_balance < amount {
            return Err(SettlementError::InsufficientBalance {
                available: sender_balance,
                requested: amount,
            });
        }
        let sender_after = sender_balance - amount;
        unit.set_balance(sender.id, sender_after).await?;
        unit.set_balance(recipient.id, recipient_balance + amount)
            .await?;

        let refs = reference::transfer_references();
        let debit = unit
            .insert_transaction(TransactionInsert {
                user_id: sender.user_id,
                wallet_id: sender.id,
                kind: TransactionKind::TransferDebit,
                amount,
                status: TransactionStatus::Success,
                reference: refs.debit,
                external_reference: None,
                counterparty_wallet_id: Some(recipient.id),
                counterparty_user_id: Some(recipient.user_id),
                description: Some(format!("Transfer to wallet {}", recipient.wallet_number)),
            })
            .await?;
        let credit = unit
            .insert_transaction(TransactionInsert {
                user_id: recipient.user_id,
                wallet_id: recipient.id,
                kind: TransactionKind::TransferCredit,
                amount,
                status: TransactionStatus::Success,
                reference: refs.credit,
                external_reference: None,
                counterparty_wallet_id: Some(sender.id),
                counterparty_user_id: Some(sender.user_id),
                description: Some(format!("Transfer from wallet {}", sender.wallet_number)),
            })
            .await?;
        unit.commit().await?;

        info!(
            from_wallet = %sender.wallet_number,
            to_wallet = %recipient.wallet_number,
            amount = %amount,
            reference = %debit.reference,
            "Transfer committed"
        );
        Ok(TransferReceipt {
            debit,
            credit,
            sender_balance: sender_after,
        })
    }

    pub async fn get_balance(&self, user_id: Uuid) -> Result<Decimal, SettlementError> {
        Ok(self.get_wallet_info(user_id).await?.balance)
    }

    pub async fn get_wallet_info(&self, user_id: Uuid) -> Result<Wallet, SettlementError> {
        self.store
            .find_wallet_by_user(user_id)
            .await?
            .ok_or(SettlementError::WalletNotFound(WalletLookup::User(user_id)))
    }

    /// Look up one of `user_id`'s deposits by its internal reference.
    pub async fn get_deposit_status(
        &self,
        user_id: Uuid,
        reference: &str,
    ) -> Result<LedgerTransaction, SettlementError> {
        self.store
            .find_transaction_by_reference(reference)
            .await?
            .filter(|t| t.user_id == user_id && t.kind == TransactionKind::Deposit)
            .ok_or(SettlementError::TransactionNotFound)
    }

    pub async fn get_transaction_history(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LedgerTransaction>, SettlementError> {
        let (limit, offset) = clamp_pagination(limit, offset);
        Ok(self
            .store
            .list_transactions_by_user(user_id, limit, offset)
            .await?)
    }
}
