use cosmos_sdk_proto::cosmos::{
    auth::v1beta1::{QueryAccountRequest, QueryAccountResponse},
    bank::v1beta1::{QueryAllBalancesRequest, QueryAllBalancesResponse},
    tx::v1beta1::{SimulateRequest, SimulateResponse},
};
use tonic::async_trait;

use crate::error::Action;

use super::grpc::GrpcClient;

/// A protobuf query which can be sent over gRPC or as a Tendermint ABCI query.
#[async_trait]
pub(crate) trait QueryRequest: prost::Message + Sized + Send + 'static {
    type Response: prost::Message + Default + Send;

    /// gRPC method path, used as the ABCI query path.
    const ABCI_PATH: &'static str;

    fn action(&self) -> Action;

    async fn perform_grpc(
        self,
        client: &GrpcClient,
    ) -> Result<tonic::Response<Self::Response>, tonic::Status>;
}

#[async_trait]
impl QueryRequest for QueryAccountRequest {
    type Response = QueryAccountResponse;
    const ABCI_PATH: &'static str = "/cosmos.auth.v1beta1.Query/Account";

    fn action(&self) -> Action {
        Action::GetAccount(self.address.clone())
    }

    async fn perform_grpc(
        self,
        client: &GrpcClient,
    ) -> Result<tonic::Response<Self::Response>, tonic::Status> {
        client.auth_query_client().account(self).await
    }
}

#[async_trait]
impl QueryRequest for QueryAllBalancesRequest {
    type Response = QueryAllBalancesResponse;
    const ABCI_PATH: &'static str = "/cosmos.bank.v1beta1.Query/AllBalances";

    fn action(&self) -> Action {
        Action::AllBalances(self.address.clone())
    }

    async fn perform_grpc(
        self,
        client: &GrpcClient,
    ) -> Result<tonic::Response<Self::Response>, tonic::Status> {
        client.bank_query_client().all_balances(self).await
    }
}

#[async_trait]
impl QueryRequest for SimulateRequest {
    type Response = SimulateResponse;
    const ABCI_PATH: &'static str = "/cosmos.tx.v1beta1.Service/Simulate";

    fn action(&self) -> Action {
        Action::Simulate
    }

    async fn perform_grpc(
        self,
        client: &GrpcClient,
    ) -> Result<tonic::Response<Self::Response>, tonic::Status> {
        client.tx_service_client().simulate(self).await
    }
}
