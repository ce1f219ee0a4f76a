//! Generating notifications for things that fall due soon.

use rusqlite::Connection;
use serde::Serialize;
use time::{Date, Duration};

use crate::{
    Error,
    auth::UserID,
    financing::{get_financing_summary, get_financings},
    fixed_account::get_fixed_accounts,
    investment::get_goals,
    notification::{NewNotification, NotificationKind, insert_notification},
    obligation::{Direction, ObligationQuery, SettlementStatus, get_obligations},
    settings::get_settings,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    /// The number of new notifications.
    pub created: usize,
}

fn due_title(what: &str, due_date: Date, today: Date) -> String {
    if due_date < today {
        format!("{what} overdue")
    } else if due_date == today {
        format!("{what} due today")
    } else {
        format!("{what} due soon")
    }
}

/// Everything that should be notified about for the user as of `today`.
fn collect_notifications(
    user_id: UserID,
    today: Date,
    connection: &Connection,
) -> Result<Vec<NewNotification>, Error> {
    let reminder_days = get_settings(user_id, connection)?.reminder_days;
    let window_end = today + Duration::days(i64::from(reminder_days));
    let mut notifications = Vec::new();

    for (direction, kind, what) in [
        (
            Direction::Receivable,
            NotificationKind::ReceivableDue,
            "Receivable",
        ),
        (Direction::Payable, NotificationKind::PayableDue, "Payable"),
    ] {
        let query = ObligationQuery {
            to: Some(window_end),
            ..Default::default()
        };

        for obligation in get_obligations(user_id, direction, &query, today, connection)?
            .into_iter()
            .filter(|obligation| obligation.settlement.status != SettlementStatus::Paid)
        {
            notifications.push(NewNotification {
                kind,
                title: due_title(what, obligation.due_date, today),
                message: format!(
                    "{}: {} due on {}",
                    obligation.description,
                    obligation.settlement.remaining_amount,
                    obligation.due_date
                ),
                reference: format!("{direction}:{}:{}", obligation.id, obligation.due_date),
            });
        }
    }

    for fixed_account in get_fixed_accounts(user_id, connection)?
        .into_iter()
        .filter(|fixed_account| fixed_account.active && fixed_account.next_due_date <= window_end)
    {
        notifications.push(NewNotification {
            kind: NotificationKind::FixedAccountDue,
            title: due_title("Bill", fixed_account.next_due_date, today),
            message: format!(
                "{}: {} due on {}",
                fixed_account.description, fixed_account.amount, fixed_account.next_due_date
            ),
            reference: format!(
                "fixed_account:{}:{}",
                fixed_account.id, fixed_account.next_due_date
            ),
        });
    }

    for financing in get_financings(user_id, connection)? {
        let summary = get_financing_summary(&financing, connection)?;
        let Some(installment) = summary.next_installment else {
            continue;
        };

        if installment.due_date <= window_end {
            notifications.push(NewNotification {
                kind: NotificationKind::FinancingDue,
                title: due_title("Installment", installment.due_date, today),
                message: format!(
                    "{} installment {}/{}: {} due on {}",
                    financing.description,
                    installment.number,
                    financing.installments,
                    installment.payment,
                    installment.due_date
                ),
                reference: format!("financing:{}:{}", financing.id, installment.number),
            });
        }
    }

    for goal in get_goals(user_id, connection)?
        .into_iter()
        .filter(|goal| goal.achieved)
    {
        notifications.push(NewNotification {
            kind: NotificationKind::GoalAchieved,
            title: "Goal achieved".to_owned(),
            message: format!(
                "{} reached {} of {}",
                goal.name, goal.current_amount, goal.target_amount
            ),
            reference: format!("goal:{}", goal.id),
        });
    }

    Ok(notifications)
}

/// Create the notifications the user does not have yet.
///
/// Receivables, payables, fixed accounts and financing installments that are overdue or due
/// within the user's `reminder_days` get a notification, as do achieved investment goals. Each
/// event has a reference key so running this again does not create duplicates.
pub fn refresh_notifications(
    user_id: UserID,
    today: Date,
    connection: &Connection,
) -> Result<RefreshSummary, Error> {
    let mut created = 0;

    for notification in collect_notifications(user_id, today, connection)? {
        if insert_notification(user_id, &notification, connection)? {
            created += 1;
        }
    }

    tracing::debug!("created {created} notifications for user {user_id}");

    Ok(RefreshSummary { created })
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use time::{Date, macros::date};

    use crate::{
        account::{AccountRequest, create_account},
        db::test_utils::must_create_connection_and_user,
        financing::{AmortizationSystem, FinancingRequest, create_financing},
        fixed_account::{FixedAccountRequest, Frequency, create_fixed_account},
        investment::{
            GoalRequest, InvestmentKind, InvestmentRequest, create_goal, create_investment,
        },
        money::Money,
        notification::{NotificationKind, get_notifications},
        obligation::{Direction, ObligationRequest, create_obligation},
        percent::Percent,
    };

    use super::refresh_notifications;

    fn obligation(description: &str, due_date: Date) -> ObligationRequest {
        ObligationRequest {
            counterparty_id: None,
            category_id: None,
            description: description.to_owned(),
            amount: Money::from_cents(10_000),
            issue_date: Some(date!(2025 - 01 - 01)),
            due_date,
            notes: None,
        }
    }

    #[test]
    fn notifies_due_items_once() {
        let (connection, user_id) = must_create_connection_and_user();
        let today = date!(2025 - 03 - 10);
        let account_id = create_account(user_id, AccountRequest::named("Checking"), &connection)
            .unwrap()
            .id;
        create_obligation(
            user_id,
            Direction::Payable,
            obligation("Electricity", date!(2025 - 03 - 08)),
            today,
            &connection,
        )
        .unwrap();
        create_obligation(
            user_id,
            Direction::Receivable,
            obligation("Invoice", date!(2025 - 03 - 12)),
            today,
            &connection,
        )
        .unwrap();
        create_obligation(
            user_id,
            Direction::Receivable,
            obligation("Far away", date!(2025 - 06 - 01)),
            today,
            &connection,
        )
        .unwrap();
        create_fixed_account(
            user_id,
            FixedAccountRequest {
                description: "Rent".to_owned(),
                amount: Money::from_cents(100_000),
                frequency: Frequency::Monthly,
                start_date: date!(2025 - 03 - 13),
                end_date: None,
                account_id,
                category_id: None,
                active: None,
            },
            &connection,
        )
        .unwrap();
        create_financing(
            user_id,
            FinancingRequest {
                description: "Car".to_owned(),
                lender: None,
                principal: Money::from_cents(120_000),
                annual_interest_rate: Percent::from_str("0").unwrap(),
                installments: 12,
                first_due_date: date!(2025 - 03 - 11),
                system: AmortizationSystem::Price,
                account_id: None,
                category_id: None,
            },
            &connection,
        )
        .unwrap();

        let first = refresh_notifications(user_id, today, &connection).unwrap();
        let second = refresh_notifications(user_id, today, &connection).unwrap();

        assert_eq!(first.created, 4);
        assert_eq!(second.created, 0);
        let notifications = get_notifications(user_id, false, &connection).unwrap();
        let payable = notifications
            .iter()
            .find(|notification| notification.kind == NotificationKind::PayableDue)
            .unwrap();
        assert_eq!(payable.title, "Payable overdue");
        assert!(payable.reference.starts_with("payable:"));
    }

    #[test]
    fn notifies_achieved_goals() {
        let (connection, user_id) = must_create_connection_and_user();
        create_investment(
            user_id,
            InvestmentRequest {
                current_value: Some(Money::from_cents(200)),
                ..InvestmentRequest::named("Savings", InvestmentKind::Savings)
            },
            &connection,
        )
        .unwrap();
        for cents in [100, 1_000] {
            create_goal(
                user_id,
                GoalRequest {
                    name: format!("Save {cents}"),
                    target_amount: Money::from_cents(cents),
                    target_date: None,
                    investment_id: None,
                },
                &connection,
            )
            .unwrap();
        }

        let summary = refresh_notifications(user_id, date!(2025 - 01 - 01), &connection).unwrap();

        assert_eq!(summary.created, 1);
        let notifications = get_notifications(user_id, false, &connection).unwrap();
        assert_eq!(notifications[0].kind, NotificationKind::GoalAchieved);
        assert_eq!(notifications[0].message, "Save 100 reached 2.00 of 1.00");
    }
}
