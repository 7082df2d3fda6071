use std::collections::HashMap;

use tokio::sync::oneshot;

use crate::error::*;
use crate::message::*;

/// Event is a transaction outcome: the matched response message or the
/// error that terminated the transaction.
#[derive(Debug)]
pub struct Event {
    pub result: Result<Message>,
}

/// Agent is a low-level abstraction over a transaction list, routing
/// responses to the task that started the matching transaction.
#[derive(Default)]
pub struct Agent {
    transactions: HashMap<TransactionId, oneshot::Sender<Event>>,
    closed: bool,
}

impl Agent {
    pub fn new() -> Self {
        Agent::default()
    }

    /// start registers transaction with id.
    pub fn start(&mut self, id: TransactionId, tx: oneshot::Sender<Event>) -> Result<()> {
        if self.closed {
            return Err(Error::ErrAgentClosed);
        }
        if self.transactions.contains_key(&id) {
            return Err(Error::ErrTransactionExists);
        }
        self.transactions.insert(id, tx);
        Ok(())
    }

    /// stop unregisters the transaction, notifying the waiter.
    pub fn stop(&mut self, id: TransactionId) -> Result<()> {
        if self.closed {
            return Err(Error::ErrAgentClosed);
        }
        let tx = self
            .transactions
            .remove(&id)
            .ok_or(Error::ErrTransactionNotExists)?;
        let _ = tx.send(Event {
            result: Err(Error::ErrTransactionStopped),
        });
        Ok(())
    }

    /// process routes an incoming response to the transaction that sent
    /// the request. Messages that match no transaction are reported back
    /// as unhandled.
    pub fn process(&mut self, message: Message) -> Result<()> {
        if self.closed {
            return Err(Error::ErrAgentClosed);
        }
        match self.transactions.remove(&message.transaction_id) {
            Some(tx) => {
                let _ = tx.send(Event {
                    result: Ok(message),
                });
                Ok(())
            }
            None => Err(Error::ErrTransactionNotExists),
        }
    }

    /// close terminates all transactions with ErrAgentClosed and renders
    /// the agent unusable.
    pub fn close(&mut self) {
        for (_, tx) in self.transactions.drain() {
            let _ = tx.send(Event {
                result: Err(Error::ErrAgentClosed),
            });
        }
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
