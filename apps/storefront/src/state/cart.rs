//! # Cart State
//!
//! Holds the one `CartStore` of this storefront.
//!
//! ## Thread Safety
//! The store is wrapped in `Arc<Mutex<T>>` because handlers run
//! concurrently and every mutation must see the previous one. The lock is
//! never held across an `.await`: commands read what they need, release the
//! lock, do their I/O and lock again to apply the result.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart State Operations                                │
//! │                                                                         │
//! │  UI Action               Command                 Store Change           │
//! │  ─────────               ───────                 ────────────           │
//! │                                                                         │
//! │  Add to cart ───────────► add_to_cart() ───────► add_payload()          │
//! │                                                                         │
//! │  Change quantity ───────► update_cart_item() ──► update_quantity()      │
//! │                                                                         │
//! │  Click remove ──────────► remove_from_cart() ──► remove_item()          │
//! │                                                                         │
//! │  Open drawer ───────────► refresh_cart() ──────► sync_product() × n     │
//! │                                                                         │
//! │  View cart ─────────────► get_cart() ──────────► (read only)            │
//! │                                                                         │
//! │  Every mutation saves through the storage port before returning.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::ApiError;
use layerline_core::CartStore;

#[derive(Debug)]
pub struct CartState {
    cart: Arc<Mutex<CartStore>>,

    /// Set while a checkout submission owns the cart contents.
    held: AtomicBool,
}

/// Keeps buyer edits out of the cart until dropped.
#[derive(Debug)]
pub struct CartHold<'a> {
    state: &'a CartState,
}

impl Drop for CartHold<'_> {
    fn drop(&mut self) {
        self.state.held.store(false, Ordering::SeqCst);
    }
}

impl CartState {
    /// Wraps a store built (and usually hydrated) at startup.
    pub fn new(store: CartStore) -> Self {
        CartState {
            cart: Arc::new(Mutex::new(store)),
            held: AtomicBool::new(false),
        }
    }

    /// Freezes the cart for a submission.
    ///
    /// The flag is raised under the cart lock, so an edit either lands
    /// before the hold (and is part of what gets submitted) or is refused.
    pub fn hold(&self) -> CartHold<'_> {
        let _cart = self.cart.lock().unwrap_or_else(PoisonError::into_inner);
        self.held.store(true, Ordering::SeqCst);
        CartHold { state: self }
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }

    /// Applies a buyer edit, refused with `SUBMISSION_IN_PROGRESS` while
    /// the cart is held.
    pub fn edit<F, R>(&self, f: F) -> Result<R, ApiError>
    where
        F: FnOnce(&mut CartStore) -> R,
    {
        let mut cart = self.cart.lock().unwrap_or_else(PoisonError::into_inner);
        if self.held.load(Ordering::SeqCst) {
            return Err(ApiError::submission_in_progress());
        }
        Ok(f(&mut cart))
    }

    /// Executes a function with read access to the cart.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let count = cart_state.with_cart(|cart| cart.total_items());
    /// ```
    pub fn with_cart<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&CartStore) -> R,
    {
        let cart = self.cart.lock().unwrap_or_else(PoisonError::into_inner);
        f(&cart)
    }

    /// Executes a function with write access to the cart.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let added = cart_state.with_cart_mut(|cart| cart.add_payload(payload));
    /// ```
    pub fn with_cart_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut CartStore) -> R,
    {
        let mut cart = self.cart.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut cart)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use layerline_core::{MemoryStorage, Product, CART_STORAGE_KEY};

    fn product(id: &str, stock: u32) -> Product {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "name": format!("Product {}", id),
            "priceCents": 1000,
            "stock": stock,
        }))
        .unwrap()
    }

    #[test]
    fn test_mutations_are_visible_to_reads() {
        let state = CartState::new(CartStore::new(
            Arc::new(MemoryStorage::new()),
            CART_STORAGE_KEY,
        ));

        assert!(state.with_cart_mut(|cart| cart.add_item(&product("a", 5), 2, vec![], None, None)));
        assert_eq!(state.with_cart(|cart| cart.total_items()), 2);
    }

    #[test]
    fn test_edits_refused_while_held() {
        let state = CartState::new(CartStore::new(
            Arc::new(MemoryStorage::new()),
            CART_STORAGE_KEY,
        ));
        state
            .edit(|cart| cart.add_item(&product("a", 5), 1, vec![], None, None))
            .unwrap();

        let hold = state.hold();
        assert!(state.is_held());
        let err = state
            .edit(|cart| cart.add_item(&product("b", 5), 1, vec![], None, None))
            .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::SubmissionInProgress);

        // the submission itself still clears through the unguarded path
        state.with_cart_mut(|cart| cart.clear());
        drop(hold);

        assert!(!state.is_held());
        assert!(state
            .edit(|cart| cart.add_item(&product("b", 5), 1, vec![], None, None))
            .unwrap());
        assert_eq!(state.with_cart(|cart| cart.total_items()), 1);
    }

    #[test]
    fn test_survives_a_poisoned_lock() {
        let state = Arc::new(CartState::new(CartStore::new(
            Arc::new(MemoryStorage::new()),
            CART_STORAGE_KEY,
        )));

        let poisoner = state.clone();
        let _ = std::thread::spawn(move || {
            poisoner.with_cart_mut(|_| panic!("boom"));
        })
        .join();

        assert!(state.with_cart(|cart| cart.is_empty()));
    }
}
