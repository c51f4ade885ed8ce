use super::{
    pool, require_viewer, secret,
    types::{
        AccountInput, AuthPayload, CategoryInput, GqlAccount, GqlCategory, GqlTransaction,
        LoginInput, RefreshPayload, RegisterInput, TransactionInput, VerifyPayload,
    },
    GqlResultExt,
};
use crate::routes::{
    accounts::{check_balance, CreateAccountRequest},
    auth::{self as auth_routes, AuthResponse, LoginRequest, RegisterRequest},
    categories::CreateCategoryRequest,
    transactions::CreateTransactionRequest,
};
use async_graphql::{Context, Object, Result};
use casho_shared::{
    ledger::{self, NewTransaction},
    models::{
        account::{Account, CreateAccount},
        category::{Category, CreateCategory},
    },
};
use validator::Validate;

pub struct MutationRoot;

impl From<AuthResponse> for AuthPayload {
    fn from(res: AuthResponse) -> Self {
        Self {
            user: res.user.into(),
            access_token: res.access,
            refresh_token: res.refresh,
        }
    }
}

#[Object]
impl MutationRoot {
    async fn create_category(
        &self,
        ctx: &Context<'_>,
        input: CategoryInput,
    ) -> Result<GqlCategory> {
        let auth = require_viewer(ctx)?;

        let req = CreateCategoryRequest {
            name: input.name,
            kind: input.kind.into(),
            icon: input.icon,
            color: input.color,
        };
        req.validate().gql()?;

        let category = Category::create(
            pool(ctx)?,
            CreateCategory {
                user_id: auth.user_id,
                name: req.name.trim().to_string(),
                kind: req.kind,
                icon: req.icon,
                color: req.color,
            },
        )
        .await
        .gql()?;

        Ok(category.into())
    }

    /// Records a transaction; the type is taken from the category when omitted
    async fn create_transaction(
        &self,
        ctx: &Context<'_>,
        input: TransactionInput,
    ) -> Result<GqlTransaction> {
        let auth = require_viewer(ctx)?;

        let req = CreateTransactionRequest {
            category: input.category_id,
            account: input.account_id,
            kind: input.kind.map(Into::into),
            amount: input.amount,
            description: input.description,
            date: input.date,
        };
        req.validate().gql()?;

        let transaction = ledger::record_transaction(
            pool(ctx)?,
            auth.user_id,
            NewTransaction {
                account_id: req.account,
                category_id: req.category,
                kind: req.kind,
                amount: req.amount,
                description: req.description,
                transaction_date: req.date,
            },
        )
        .await
        .gql()?;

        Ok(transaction.into())
    }

    async fn create_account(&self, ctx: &Context<'_>, input: AccountInput) -> Result<GqlAccount> {
        let auth = require_viewer(ctx)?;

        let req = CreateAccountRequest {
            name: input.name,
            currency: input.currency.into(),
            balance: input.balance,
        };
        req.validate().gql()?;
        check_balance(req.balance).gql()?;

        let account = Account::create(
            pool(ctx)?,
            CreateAccount {
                user_id: auth.user_id,
                name: req.name.trim().to_string(),
                currency: req.currency,
                balance: req.balance,
            },
        )
        .await
        .gql()?;

        Ok(account.into())
    }

    async fn register(&self, ctx: &Context<'_>, input: RegisterInput) -> Result<AuthPayload> {
        let req = RegisterRequest {
            username: input.username,
            email: input.email,
            password: input.password,
            password_confirm: input.password_confirm,
            phone: input.phone,
        };

        let res = auth_routes::register_user(pool(ctx)?, secret(ctx)?, req)
            .await
            .gql()?;

        Ok(res.into())
    }

    async fn login(&self, ctx: &Context<'_>, input: LoginInput) -> Result<AuthPayload> {
        let req = LoginRequest {
            email: input.email,
            password: input.password,
        };

        let res = auth_routes::login_user(pool(ctx)?, secret(ctx)?, req)
            .await
            .gql()?;

        Ok(res.into())
    }

    async fn refresh_token(&self, ctx: &Context<'_>, refresh_token: String) -> Result<RefreshPayload> {
        let access_token =
            auth_routes::exchange_refresh_token(pool(ctx)?, secret(ctx)?, &refresh_token)
                .await
                .gql()?;

        Ok(RefreshPayload { access_token })
    }

    async fn verify_token(&self, ctx: &Context<'_>, token: String) -> Result<VerifyPayload> {
        let claims = auth_routes::verify_any_token(pool(ctx)?, secret(ctx)?, &token)
            .await
            .gql()?;

        Ok(VerifyPayload {
            user_id: claims.sub,
            token_type: claims.token_type.as_str().to_string(),
            expires_at: claims.expires_at(),
        })
    }
}
