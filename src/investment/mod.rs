//! Investments, the money put into them and the goals they count towards.

mod contribution;
mod core;
mod goal;
mod handlers;
mod portfolio;

pub use contribution::{
    Contribution, ContributionId, ContributionKind, ContributionRequest,
    create_contribution, create_investment_contribution_table, delete_contribution,
    get_contributions,
};
pub use core::{
    Investment, InvestmentId, InvestmentKind, InvestmentRequest, InvestmentValueRequest,
    create_investment, create_investment_table, delete_investment, ensure_investment,
    get_investment, get_investments, update_investment, update_investment_value,
};
pub use goal::{
    GoalId, GoalRequest, InvestmentGoal, create_goal, create_investment_goal_table, delete_goal,
    get_goal, get_goals, update_goal,
};
pub use handlers::{
    create_contribution_endpoint, create_goal_endpoint,
    create_investment_endpoint, delete_contribution_endpoint, delete_goal_endpoint,
    delete_investment_endpoint, get_goal_endpoint, get_investment_endpoint,
    list_contributions_endpoint, list_goals_endpoint, list_investments_endpoint,
    portfolio_summary_endpoint, update_goal_endpoint, update_investment_endpoint,
    update_investment_value_endpoint,
};
pub use portfolio::{PortfolioSummary, get_portfolio_summary};
